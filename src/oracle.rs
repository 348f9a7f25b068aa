//! Satisfiability oracles: anything that can decide a [`Formula`] and, when it is satisfiable, produce a model.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver, Var};

use crate::encoder::Formula;
use crate::error::OracleError;

/// A model: the truth value of every variable of a formula. Variables a model never mentions are false.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn from_lits(lits: impl IntoIterator<Item=Lit>) -> Self {
        let mut values = Vec::new();
        for lit in lits {
            let index = lit.var().index();
            if index >= values.len() {
                values.resize(index + 1, false);
            }
            values[index] = lit.is_positive();
        }

        Self { values }
    }

    /// Build from signed DIMACS indices; `0` is not a literal and is skipped.
    pub fn from_dimacs(dimacs: &[isize]) -> Self {
        Self::from_lits(dimacs.iter().filter(|n| **n != 0).map(|n| Lit::from_dimacs(*n)))
    }

    pub fn value(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    pub fn satisfies(&self, lit: Lit) -> bool {
        self.value(lit.var()) == lit.is_positive()
    }

    /// Variables assigned true, in index order.
    pub fn true_vars(&self) -> impl Iterator<Item=Var> + '_ {
        self.values.iter()
            .enumerate()
            .filter(|(_, value)| **value)
            .map(|(index, _)| Var::from_index(index))
    }

    /// Whether every clause has a literal this assignment satisfies.
    pub fn satisfies_all(&self, clauses: &[Vec<Lit>]) -> bool {
        clauses.iter().all(|clause| clause.iter().any(|lit| self.satisfies(*lit)))
    }
}

/// The answer to one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Satisfiable(Assignment),
    Unsatisfiable,
}

/// Decides formulas. Queries are synchronous and may take arbitrarily long.
pub trait Oracle {
    fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError>;
}

impl<O: Oracle + ?Sized> Oracle for &mut O {
    fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError> {
        (**self).query(formula)
    }
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError> {
        (**self).query(formula)
    }
}

/// Solves in-process with [`varisat`]. A fresh solver is used for every query.
#[derive(Copy, Clone, Debug, Default)]
pub struct VarisatOracle;

impl Oracle for VarisatOracle {
    fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError> {
        let mut cnf = CnfFormula::new();
        cnf.set_var_count(formula.num_variables());
        for clause in formula.clauses() {
            cnf.add_clause(clause);
        }

        debug!(variables = cnf.var_count(), clauses = cnf.len(), "querying varisat");
        let mut solver = Solver::new();
        solver.add_formula(&cnf);

        match solver.solve() {
            Ok(true) => solver.model()
                .map(|model| Verdict::Satisfiable(Assignment::from_lits(model)))
                .ok_or(OracleError::Indeterminate),
            Ok(false) => Ok(Verdict::Unsatisfiable),
            Err(err) => Err(OracleError::Solver(err.to_string())),
        }
    }
}

static QUERY_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Runs an external solver that reads DIMACS CNF and reports in the SAT competition output format.
///
/// The formula is saved to a scratch file and the program is invoked as `<program> <args...> <file>`.
/// For Glucose this means passing `-model` as an argument so that the model is printed.
#[derive(Clone, Debug)]
pub struct DimacsOracle {
    program: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl DimacsOracle {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item=S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn scratch_path(&self) -> PathBuf {
        let n = QUERY_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir.join(format!("linksat-{}-{n}.cnf", std::process::id()))
    }

    fn run(&self, path: &Path) -> Result<Verdict, OracleError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("running oracle: {:?}", cmd);
        let output = cmd.output().map_err(|source| OracleError::Unavailable {
            program: self.program.clone(),
            source,
        })?;

        // 10 and 20 are the conventional exit codes for SAT and UNSAT
        match output.status.code() {
            Some(0 | 10 | 20) => {}
            _ => return Err(OracleError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!(%stdout, "oracle output");
        parse_verdict(&stdout)
    }
}

impl Oracle for DimacsOracle {
    fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError> {
        let path = self.scratch_path();
        let verdict = std::fs::File::create(&path)
            .and_then(|file| formula.write_dimacs(std::io::BufWriter::new(file)))
            .map_err(OracleError::from)
            .and_then(|()| self.run(&path));

        // also reached when writing failed part way
        if let Err(err) = std::fs::remove_file(&path) {
            debug!(path = %path.display(), %err, "could not remove scratch formula");
        }
        verdict
    }
}

/// Read a verdict from solver output.
///
/// `s SATISFIABLE` and `s UNSATISFIABLE` status lines decide the verdict; `v` lines carry the model, ending at a `0` or the end of the line.
/// Model lines without a status line are taken as satisfiable. Comment lines and anything else are ignored.
pub fn parse_verdict(output: &str) -> Result<Verdict, OracleError> {
    let mut status = None;
    let mut model = Vec::new();
    let mut has_model = false;

    for line in output.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("s ") {
            status = match rest.trim() {
                "SATISFIABLE" => Some(true),
                "UNSATISFIABLE" => Some(false),
                _ => return Err(OracleError::Indeterminate),
            };
        } else if let Some(rest) = line.strip_prefix('v') {
            has_model = true;
            for token in rest.split_whitespace() {
                let n = token.parse::<isize>()
                    .map_err(|_| OracleError::Parse(format!("bad literal {token:?} in model line")))?;
                if n == 0 {
                    break;
                }
                model.push(Lit::from_dimacs(n));
            }
        }
    }

    match (status, has_model) {
        (Some(false), _) => Ok(Verdict::Unsatisfiable),
        (Some(true), true) | (None, true) => Ok(Verdict::Satisfiable(Assignment::from_lits(model))),
        (Some(true), false) => Err(OracleError::Parse("satisfiable, but no model was printed".to_string())),
        (None, false) => Err(OracleError::Indeterminate),
    }
}

/// Replays prepared verdicts in order, recording every formula it is asked about.
#[cfg(test)]
pub(crate) struct ScriptedOracle {
    pub(crate) verdicts: std::collections::VecDeque<Verdict>,
    pub(crate) asked: Vec<Formula>,
}

#[cfg(test)]
impl ScriptedOracle {
    pub(crate) fn new(verdicts: impl IntoIterator<Item=Verdict>) -> Self {
        Self {
            verdicts: verdicts.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Oracle for ScriptedOracle {
    fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError> {
        self.asked.push(formula.clone());
        self.verdicts.pop_front().ok_or(OracleError::Indeterminate)
    }
}
