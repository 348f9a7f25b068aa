//! The refinement loop: encode, query, look for loops, block them, and try again.
//!
//! ```text
//! Encode ──▶ Query ──unsat──▶ Escalate ──▶ Encode        (occupancy, escalating strategy, once)
//!              │    ──unsat──▶ Done(Unsolvable)
//!              └─sat─▶ Detect ──loops──▶ Encode           (same theory, more blocking clauses)
//!                        └──clean──▶ Done(Solved)
//! ```

use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use varisat::Lit;

use crate::config::{SolverConfig, Strategy};
use crate::cycles::detect;
use crate::encoder::{blocking_clauses, Formula, Theory};
use crate::error::SolveError;
use crate::grid::Grid;
use crate::location::Location;
use crate::oracle::{Assignment, Oracle, Verdict};
use crate::placement::Placement;
use crate::solution::Solution;
use crate::variables::VariableMap;

/// How a run ended. Neither outcome is an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Solved(Solution),
    /// Unsatisfiable under every theory the strategy allows.
    Unsolvable,
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Solved(solution) => Some(solution),
            Self::Unsolvable => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Build the formula of the current theory, blocking clauses first.
    Encode,
    /// Hand the formula to the oracle.
    Query,
    /// Look for loops in the model the oracle returned.
    Detect,
    /// Switch from the occupancy theory to the direction theory and forget all blocking clauses.
    Escalate,
    Done(Outcome),
}

/// What happened to one oracle query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Iteration {
    pub theory: Theory,
    pub variables: usize,
    pub clauses: usize,
    pub blocking: usize,
    pub satisfiable: bool,
    /// Loops found in the model, if it was satisfiable.
    pub cycles: usize,
    /// Wall-clock time the oracle took to answer.
    pub elapsed: Duration,
}

/// A summary of a run, kept alongside its [`Outcome`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub strategy: Strategy,
    /// The theory of the last query.
    pub theory: Theory,
    pub escalated: bool,
    pub iterations: Vec<Iteration>,
}

/// One run of the refinement loop over one grid.
///
/// Call [`Self::step`] to make a single transition, or [`Self::run`] to go until [`State::Done`].
pub struct Refinement<'g, O> {
    grid: &'g Grid,
    oracle: O,
    config: SolverConfig,
    theory: Theory,
    variables: Rc<VariableMap>,
    // carried across iterations of one theory
    blocking: Vec<Vec<Lit>>,
    formula: Option<Formula>,
    model: Option<Assignment>,
    escalated: bool,
    iterations: Vec<Iteration>,
    state: State,
}

impl<'g, O: Oracle> Refinement<'g, O> {
    pub fn new(grid: &'g Grid, oracle: O, config: SolverConfig) -> Self {
        let theory = config.strategy().first_theory();
        let variables = Rc::new(theory.encoder().allocate(grid));

        Self {
            grid,
            oracle,
            config,
            theory,
            variables,
            blocking: Vec::new(),
            formula: None,
            model: None,
            escalated: false,
            iterations: Vec::new(),
            state: State::Encode,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn theory(&self) -> Theory {
        self.theory
    }

    /// The blocking clauses the next [`State::Encode`] will prefix.
    pub fn blocking(&self) -> &[Vec<Lit>] {
        &self.blocking
    }

    /// The most recently encoded formula.
    pub fn formula(&self) -> Option<&Formula> {
        self.formula.as_ref()
    }

    pub fn iterations(&self) -> &[Iteration] {
        &self.iterations
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Make one transition and return the new state. Once done, the state no longer changes.
    pub fn step(&mut self) -> Result<&State, SolveError> {
        let next = match &self.state {
            State::Encode => self.encode()?,
            State::Query => self.query()?,
            State::Detect => self.detect()?,
            State::Escalate => self.escalate(),
            State::Done(_) => return Ok(&self.state),
        };

        debug!(?next, "refinement transition");
        self.state = next;
        Ok(&self.state)
    }

    /// Step until done.
    pub fn run(mut self) -> Result<(Outcome, Report), SolveError> {
        let outcome = loop {
            if let State::Done(outcome) = self.step()? {
                break outcome.clone();
            }
        };

        let report = Report {
            strategy: self.config.strategy(),
            theory: self.theory,
            escalated: self.escalated,
            iterations: self.iterations,
        };

        info!(
            solved = matches!(outcome, Outcome::Solved(_)),
            theory = %report.theory,
            queries = report.iterations.len(),
            "refinement finished"
        );
        Ok((outcome, report))
    }

    fn encode(&mut self) -> Result<State, SolveError> {
        let encoder = self.theory.encoder();
        let formula = encoder.encode(self.grid, &self.variables, &self.blocking);

        if let Some(path) = self.config.dump_path(self.theory, self.iterations.len() + 1) {
            encoder.save(&formula, &path)?;
            debug!(path = %path.display(), "saved formula");
        }

        self.formula = Some(formula);
        Ok(State::Query)
    }

    fn query(&mut self) -> Result<State, SolveError> {
        if let Some(max) = self.config.max_iterations() {
            if self.iterations.len() >= max.get() {
                return Err(SolveError::IterationLimit(max.get()));
            }
        }

        let Some(formula) = self.formula.as_ref() else {
            return Ok(State::Encode);
        };
        let started = Instant::now();
        let verdict = self.oracle.query(formula)?;
        let elapsed = started.elapsed();

        let satisfiable = matches!(verdict, Verdict::Satisfiable(_));
        self.iterations.push(Iteration {
            theory: self.theory,
            variables: formula.num_variables(),
            clauses: formula.num_clauses(),
            blocking: formula.num_blocking(),
            satisfiable,
            cycles: 0,
            elapsed,
        });
        info!(
            iteration = self.iterations.len(),
            theory = %self.theory,
            clauses = formula.num_clauses(),
            satisfiable,
            ?elapsed,
            "oracle answered"
        );

        Ok(match verdict {
            Verdict::Satisfiable(model) => {
                self.model = Some(model);
                State::Detect
            }
            Verdict::Unsatisfiable if self.config.strategy().escalates() && !self.escalated && self.theory == Theory::Occupancy => State::Escalate,
            Verdict::Unsatisfiable => State::Done(Outcome::Unsolvable),
        })
    }

    fn detect(&mut self) -> Result<State, SolveError> {
        let Some(model) = self.model.take() else {
            return Ok(State::Encode);
        };

        let placement = Placement::decode(self.grid, &self.variables, &model)?;
        let detection = detect(self.grid, &placement);
        if let Some(last) = self.iterations.last_mut() {
            last.cycles = detection.cycles.len();
        }

        if detection.is_clean() {
            let solution = Solution::reconstruct(self.grid, &placement, &detection.walks)?;
            return Ok(State::Done(Outcome::Solved(solution)));
        }

        if detection.cycles.is_empty() {
            // some walk stopped short, yet left nothing to block
            let path = detection.walks.iter().position(|walk| !walk.is_complete()).map_or(1, |index| index + 1);
            let location = self.grid.termini(path).map_or(Location(0, 0), |(start, _)| start);
            return Err(SolveError::InconsistentModel {
                location,
                reason: format!("path {path} does not reach its other terminal"),
            });
        }

        for cycle in &detection.cycles {
            debug!(path = ?cycle.path(), cells = cycle.len(), "blocking loop");
            self.blocking.extend(blocking_clauses(self.grid, &self.variables, cycle));
        }
        Ok(State::Encode)
    }

    fn escalate(&mut self) -> State {
        info!(from = %self.theory, to = %Theory::OccupancyDirection, "escalating");
        self.theory = Theory::OccupancyDirection;
        self.escalated = true;
        self.variables = Rc::new(self.theory.encoder().allocate(self.grid));
        self.blocking.clear();
        State::Encode
    }
}

/// Run the refinement loop on `grid` to completion.
pub fn solve<O: Oracle>(grid: &Grid, oracle: O, config: SolverConfig) -> Result<(Outcome, Report), SolveError> {
    Refinement::new(grid, oracle, config).run()
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;
    use std::time::Duration;

    use crate::config::{SolverConfig, Strategy};
    use crate::encoder::{Formula, Theory};
    use crate::error::{OracleError, SolveError};
    use crate::grid::Grid;
    use crate::location::Location;
    use crate::oracle::{Assignment, Oracle, ScriptedOracle, Verdict};
    use crate::refine::{Outcome, Refinement, State};
    use crate::variables::{Proposition, VariableMap};

    fn occupancy_model(grid: &Grid, rows: &[&str]) -> Verdict {
        let variables = VariableMap::allocate(grid, Theory::Occupancy);
        Verdict::Satisfiable(Assignment::from_lits(rows.iter()
            .enumerate()
            .flat_map(|(y, row)| row.chars().enumerate().map(move |(x, c)| (Location(x, y), c)))
            .map(|(location, c)| variables.lit(Proposition::occupancy(location, c.to_digit(10).unwrap() as usize)))))
    }

    fn two_rows() -> Grid {
        "1,.,1\n2,.,2".parse().unwrap()
    }

    #[test]
    fn sat_without_loops_is_done() {
        let grid = two_rows();
        let oracle = ScriptedOracle::new([occupancy_model(&grid, &["111", "222"])]);
        let mut refinement = Refinement::new(&grid, oracle, SolverConfig::default());

        assert_eq!(refinement.step().unwrap(), &State::Query);
        assert_eq!(refinement.step().unwrap(), &State::Detect);
        assert!(matches!(refinement.step().unwrap(), State::Done(Outcome::Solved(_))));
        // done is final
        assert!(matches!(refinement.step().unwrap(), State::Done(Outcome::Solved(_))));
        assert_eq!(refinement.iterations().len(), 1);
    }

    #[test]
    fn unsat_escalates_once_then_gives_up() {
        let grid = two_rows();
        let oracle = ScriptedOracle::new([Verdict::Unsatisfiable, Verdict::Unsatisfiable]);
        let mut refinement = Refinement::new(&grid, oracle, SolverConfig::default());

        refinement.step().unwrap();
        assert_eq!(refinement.step().unwrap(), &State::Escalate);
        assert_eq!(refinement.step().unwrap(), &State::Encode);
        assert_eq!(refinement.theory(), Theory::OccupancyDirection);
        refinement.step().unwrap();
        assert_eq!(refinement.step().unwrap(), &State::Done(Outcome::Unsolvable));

        let asked = &refinement.oracle().asked;
        assert_eq!(asked.len(), 2);
        assert_eq!(asked[0].theory(), Theory::Occupancy);
        assert_eq!(asked[1].theory(), Theory::OccupancyDirection);
    }

    #[test]
    fn single_theory_strategies_never_escalate() {
        for strategy in [Strategy::Occupancy, Strategy::OccupancyDirection] {
            let grid = two_rows();
            let oracle = ScriptedOracle::new([Verdict::Unsatisfiable]);
            let (outcome, report) = Refinement::new(&grid, oracle, SolverConfig::default().with_strategy(strategy))
                .run()
                .unwrap();

            assert_eq!(outcome, Outcome::Unsolvable);
            assert!(!report.escalated);
            assert_eq!(report.iterations.len(), 1);
            assert_eq!(report.theory, strategy.first_theory());
        }
    }

    #[test]
    fn loops_are_blocked_and_escalation_resets_blocking() {
        let grid: Grid = ".,.,.,.,.\n.,1,2,.,.\n.,1,3,.,3\n.,.,.,.,2".parse().unwrap();
        let looped = occupancy_model(&grid, &["22211", "21211", "21333", "22222"]);
        let oracle = ScriptedOracle::new([looped, Verdict::Unsatisfiable, Verdict::Unsatisfiable]);
        let mut refinement = Refinement::new(&grid, oracle, SolverConfig::default());

        refinement.step().unwrap();
        refinement.step().unwrap();
        assert_eq!(refinement.step().unwrap(), &State::Encode);
        // one clause per path for the single loop
        assert_eq!(refinement.blocking().len(), 3);
        assert_eq!(refinement.iterations()[0].cycles, 1);

        refinement.step().unwrap();
        assert_eq!(refinement.formula().map(|f| f.num_blocking()), Some(3));
        assert_eq!(refinement.step().unwrap(), &State::Escalate);
        refinement.step().unwrap();
        assert!(refinement.blocking().is_empty());
    }

    #[test]
    fn iteration_limit() {
        let grid: Grid = ".,.,.,.,.\n.,1,2,.,.\n.,1,3,.,3\n.,.,.,.,2".parse().unwrap();
        let looped = occupancy_model(&grid, &["22211", "21211", "21333", "22222"]);
        let oracle = ScriptedOracle::new([looped.clone(), looped]);
        let config = SolverConfig::default().with_max_iterations(NonZero::new(1));

        let result = Refinement::new(&grid, oracle, config).run();
        assert!(matches!(result, Err(SolveError::IterationLimit(1))));
    }

    struct Sluggish(ScriptedOracle);

    impl Oracle for Sluggish {
        fn query(&mut self, formula: &Formula) -> Result<Verdict, OracleError> {
            std::thread::sleep(Duration::from_millis(20));
            self.0.query(formula)
        }
    }

    #[test]
    fn query_time_is_recorded() {
        let grid = two_rows();
        let oracle = Sluggish(ScriptedOracle::new([occupancy_model(&grid, &["111", "222"])]));
        let (_, report) = Refinement::new(&grid, oracle, SolverConfig::default()).run().unwrap();

        assert_eq!(report.iterations.len(), 1);
        assert!(report.iterations[0].elapsed >= Duration::from_millis(20));
    }
}
