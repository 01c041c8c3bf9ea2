use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use conquest_artisan::artisan::{Artisan, Evolvable};
use conquest_engine::{Board, BoardConfig, Game, Player};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    OrchestratorError,
    genetic::{GenerationSummary, PopulationEvolver},
    worker_pool::{WorkerPool, panic_message},
};

/// Everything needed to run a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Games played per artisan evaluation
    pub n_games: usize,
    /// Requested worker threads, clamped to the hardware
    pub n_threads: usize,
    pub board: BoardConfig,
    pub evolution: PopulationEvolver,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            n_games: 4,
            n_threads: 4,
            board: BoardConfig::default(),
            evolution: PopulationEvolver::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.n_games == 0 {
            return Err(OrchestratorError::NoGames);
        }
        self.board
            .validate()
            .map_err(OrchestratorError::InvalidBoard)?;
        self.evolution.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Done,
}

/// Final state of one game of an evaluation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    /// Cells owned by each seat, seat 0 first
    pub owned_cells: Vec<usize>,
    pub turns_played: usize,
    /// Whether the board was fully claimed, as opposed to hitting the turn
    /// limit or being abandoned
    pub completed: bool,
}

impl GameOutcome {
    fn from_game(game: &Game) -> Self {
        Self {
            owned_cells: game.players().iter().map(Player::owned_cells).collect(),
            turns_played: game.turns_played(),
            completed: game.done(),
        }
    }
}

/// What a call to [`Orchestrator::update`] observed.
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum UpdateEvent {
    /// Not started, or some game of the current round is still running
    Pending,
    /// The artisan at `index` finished its round and was scored
    ArtisanEvaluated { index: usize, fitness: f64 },
    /// The last artisan of the generation was scored and the population
    /// evolved; the summary describes the generation before evolution
    GenerationEvolved(GenerationSummary),
}

#[derive(Debug)]
struct SlotState {
    status: GameStatus,
    /// Bumped by every restart; a job only plays the round it was queued for
    round: u64,
}

#[derive(Debug)]
struct Slot {
    game: Game,
    state: Mutex<SlotState>,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status(&self) -> GameStatus {
        self.lock().status
    }

    fn round(&self) -> u64 {
        self.lock().round
    }

    /// Claims the game for a job queued in `round`. Fails if the slot was
    /// restarted since, or another job already claimed it.
    fn begin(&self, round: u64) -> bool {
        let mut state = self.lock();
        if state.round != round || !state.status.is_not_started() {
            return false;
        }
        state.status = GameStatus::InProgress;
        true
    }

    fn finish(&self) {
        self.lock().status = GameStatus::Done;
    }
}

/// Drives the evaluation of a population across a worker pool and evolves it
/// once every member has been scored.
///
/// The population is shared with workers through an `Arc` and only mutated
/// from [`update`](Self::update) once every slot is `Done`.
#[derive(Debug)]
pub struct Orchestrator<A> {
    config: OrchestratorConfig,
    population: Arc<Vec<A>>,
    opponent: Arc<dyn Artisan>,
    slots: Vec<Arc<Slot>>,
    pool: Option<WorkerPool>,
    started: bool,
    current: usize,
    generation: usize,
    last_outcomes: Vec<GameOutcome>,
}

impl<A> Orchestrator<A>
where
    A: Evolvable + 'static,
{
    /// Builds the games for `config`. Nothing runs until
    /// [`start`](Self::start).
    pub fn new<O>(config: OrchestratorConfig, population: Vec<A>, opponent: O) -> Result<Self, OrchestratorError>
    where
        O: Artisan + 'static,
    {
        config.validate()?;
        if population.is_empty() {
            return Err(OrchestratorError::EmptyPopulation);
        }

        let slots = (0..config.n_games)
            .map(|_| {
                let game = Game::new(config.board).map_err(OrchestratorError::InvalidBoard)?;
                Ok(Arc::new(Slot {
                    game,
                    state: Mutex::new(SlotState {
                        status: GameStatus::NotStarted,
                        round: 0,
                    }),
                }))
            })
            .collect::<Result<Vec<_>, OrchestratorError>>()?;

        Ok(Self {
            config,
            population: Arc::new(population),
            opponent: Arc::new(opponent),
            slots,
            pool: None,
            started: false,
            current: 0,
            generation: 0,
            last_outcomes: vec![],
        })
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Dispatches the first round. Does nothing if already started.
    pub fn start(&mut self) {
        if self.started {
            warn!("orchestrator already started");
            return;
        }
        self.started = true;
        info!(
            "starting: {} artisans, {} games each",
            self.population.len(),
            self.slots.len()
        );
        self.restart();
    }

    /// Re-randomizes every board and dispatches a round for the current
    /// artisan.
    ///
    /// Refused before [`start`](Self::start) and while any game is in
    /// progress. Games still queued from the previous round are skipped when
    /// a worker reaches them.
    pub fn restart(&mut self) {
        if !self.started {
            warn!("restart requested before start, ignoring");
            return;
        }

        // All slots stay locked from the busy check until every round is bumped.
        let mut states = self.slots.iter().map(|s| s.lock()).collect::<Vec<_>>();
        if states.iter().any(|s| s.status.is_in_progress()) {
            warn!("restart requested while games are in progress, ignoring");
            return;
        }
        for state in &mut states {
            state.round += 1;
            state.status = GameStatus::NotStarted;
        }
        drop(states);

        for slot in &self.slots {
            slot.game.reset_board();
        }
        self.dispatch();
    }

    fn dispatch(&mut self) {
        let pool = self
            .pool
            .get_or_insert_with(|| WorkerPool::new(self.config.n_threads));
        let index = self.current;
        debug!(
            "generation {}: dispatching artisan {index} to {} games",
            self.generation,
            self.slots.len()
        );

        for (game_index, slot) in self.slots.iter().enumerate() {
            let slot = Arc::clone(slot);
            let round = slot.round();
            let population = Arc::clone(&self.population);
            let opponent = Arc::clone(&self.opponent);
            pool.insert(move || {
                run_slot(&slot, round, game_index, &population[index], opponent.as_ref());
            });
        }
    }

    /// Cancels queued games and waits for the workers. Games already being
    /// played finish first.
    pub fn stop(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.cancel_all();
            pool.join();
            info!("stopped at generation {}", self.generation);
        }
        self.started = false;
    }

    /// Polls the current round without blocking.
    ///
    /// Once every game is done the active artisan is scored, the population
    /// is evolved if it was the last one, and the next round is dispatched.
    pub fn update(&mut self) -> UpdateEvent {
        if !self.started || self.slots.iter().any(|s| !s.status().is_done()) {
            return UpdateEvent::Pending;
        }

        self.last_outcomes = self.slots.iter().map(|s| GameOutcome::from_game(&s.game)).collect();
        let owned: usize = self.last_outcomes.iter().map(|o| o.owned_cells[0]).sum();
        #[expect(clippy::cast_precision_loss)]
        let fitness = owned as f64;

        let index = self.current;
        Arc::make_mut(&mut self.population)[index].set_fitness(fitness);
        debug!("generation {}: artisan {index} scored {fitness}", self.generation);

        let event = if index + 1 == self.population.len() {
            let summary = GenerationSummary::from_population(self.generation, &self.population);
            info!(
                "generation {} evaluated: best #{} max {:.1} min {:.1} mean {:.1}",
                summary.generation, summary.best_index, summary.max, summary.min, summary.mean
            );
            let next = self.config.evolution.evolve(&self.population, &mut rand::rng());
            self.population = Arc::new(next);
            self.generation += 1;
            self.current = 0;
            UpdateEvent::GenerationEvolved(summary)
        } else {
            self.current += 1;
            UpdateEvent::ArtisanEvaluated { index, fitness }
        };

        self.restart();
        event
    }

    /// Deep copy of every board, in game order.
    #[must_use]
    pub fn cells(&self) -> Vec<Board> {
        self.slots.iter().map(|s| s.game.cells()).collect()
    }

    #[must_use]
    pub fn statuses(&self) -> Vec<GameStatus> {
        self.slots.iter().map(|s| s.status()).collect()
    }

    /// Index and last recorded fitness of the artisan being evaluated.
    #[must_use]
    pub fn current_artisan(&self) -> (usize, f64) {
        (self.current, self.population[self.current].fitness())
    }

    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    #[must_use]
    pub fn population(&self) -> &[A] {
        &self.population
    }

    /// Outcomes of the most recently scored round.
    #[must_use]
    pub fn last_outcomes(&self) -> &[GameOutcome] {
        &self.last_outcomes
    }
}

impl<A> Drop for Orchestrator<A> {
    fn drop(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.cancel_all();
            pool.join();
        }
    }
}

fn run_slot(slot: &Slot, round: u64, game_index: usize, artisan: &dyn Artisan, opponent: &dyn Artisan) {
    if !slot.begin(round) {
        debug!("game {game_index}: skipping job from superseded round {round}");
        return;
    }
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        play_game(&slot.game, game_index, artisan, opponent);
    }));
    if let Err(payload) = result {
        error!("fatal: game {game_index} aborted: {}", panic_message(&*payload));
    }
    slot.finish();
}

/// Plays `game` until it is finished; seat 0 is `artisan`, every other seat
/// is `opponent`.
///
/// Rejected moves are logged and retried. The game is abandoned when a policy
/// has no move or after `max_turns * players * 4` attempts.
pub fn play_game(game: &Game, game_index: usize, artisan: &dyn Artisan, opponent: &dyn Artisan) {
    let config = game.config();
    let max_attempts = config.max_turns * config.players * 4;

    for _ in 0..max_attempts {
        if game.is_finished() {
            debug!(
                "game {game_index} finished after {} turns",
                game.turns_played()
            );
            return;
        }

        let observation = game.observe();
        let seat = observation.turn();
        let player = if seat == 0 { artisan } else { opponent };
        let Some(color) = player.play(&observation) else {
            error!(
                "game {game_index}: {} has no move for seat {seat}, abandoning",
                player.name()
            );
            return;
        };
        if let Err(e) = game.execute_turn(seat, color) {
            error!("game {game_index}: {} played an illegal move: {e}", player.name());
        }
    }

    if !game.is_finished() {
        error!("game {game_index}: gave up after {max_attempts} attempts");
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
        time::{Duration, Instant},
    };

    use conquest_artisan::artisan::RandomArtisan;
    use crossbeam::channel::{self, Receiver};
    use conquest_engine::{ColorIndex, Observation};
    use rand::Rng;

    use super::*;
    use crate::genetic::tests::Scripted;

    fn small_config() -> OrchestratorConfig {
        OrchestratorConfig {
            n_games: 4,
            n_threads: 2,
            board: BoardConfig {
                width: 8,
                height: 8,
                colors: 5,
                ..BoardConfig::default()
            },
            ..OrchestratorConfig::default()
        }
    }

    fn poll<A>(orchestrator: &mut Orchestrator<A>) -> UpdateEvent
    where
        A: Evolvable + 'static,
    {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            let event = orchestrator.update();
            if !event.is_pending() {
                return event;
            }
            assert!(Instant::now() < deadline, "round did not finish in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(30);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Counts its calls and never has a move, so every game it plays ends
    /// on its first turn. With a `gate`, each call first blocks until the
    /// gate's sender is dropped.
    #[derive(Debug, Clone)]
    struct Counting {
        plays: Arc<AtomicUsize>,
        gate: Option<Receiver<()>>,
    }

    impl Counting {
        fn new(plays: &Arc<AtomicUsize>, gate: Option<Receiver<()>>) -> Self {
            Self {
                plays: Arc::clone(plays),
                gate,
            }
        }
    }

    impl Artisan for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn play(&self, _observation: &Observation) -> Option<ColorIndex> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _ = gate.recv();
            }
            None
        }
    }

    impl Evolvable for Counting {
        fn fitness(&self) -> f64 {
            0.0
        }

        fn set_fitness(&mut self, _fitness: f64) {}

        fn mutate_random<R>(&mut self, _likelihood: f64, _rng: &mut R)
        where
            R: Rng + ?Sized,
        {
        }

        fn mutate_by_delta<R>(&mut self, _likelihood: f64, _delta: f64, _rng: &mut R)
        where
            R: Rng + ?Sized,
        {
        }

        fn crossover<R>(a: &Self, _b: &Self, _a_bias: f64, _rng: &mut R) -> Self
        where
            R: Rng + ?Sized,
        {
            a.clone()
        }
    }

    fn counting_orchestrator(
        n_games: usize,
        plays: &Arc<AtomicUsize>,
        gate: Option<Receiver<()>>,
    ) -> Orchestrator<Counting> {
        let config = OrchestratorConfig {
            n_games,
            n_threads: 1,
            ..small_config()
        };
        let population = vec![Counting::new(plays, gate), Counting::new(&Arc::default(), None)];
        Orchestrator::new(config, population, RandomArtisan).unwrap()
    }

    #[test]
    fn test_one_full_generation() {
        let population = vec![Scripted::new(1, 0.0), Scripted::new(2, 0.0)];
        let mut orchestrator =
            Orchestrator::new(small_config(), population, Scripted::default()).unwrap();
        assert!(orchestrator.update().is_pending());

        orchestrator.start();

        let UpdateEvent::ArtisanEvaluated { index, fitness } = poll(&mut orchestrator) else {
            panic!("expected the first artisan to be scored");
        };
        assert_eq!(index, 0);
        let outcomes = orchestrator.last_outcomes().to_vec();
        assert_eq!(outcomes.len(), 4);
        let owned: usize = outcomes.iter().map(|o| o.owned_cells[0]).sum();
        #[expect(clippy::cast_precision_loss)]
        let expected = owned as f64;
        assert_eq!(fitness, expected);
        for outcome in &outcomes {
            assert!(outcome.owned_cells[0] >= 5);
            assert!(outcome.owned_cells.iter().sum::<usize>() <= 64);
            assert!(outcome.completed || outcome.turns_played == 200);
        }
        assert_eq!(orchestrator.population()[0].fitness, fitness);
        assert_eq!(orchestrator.current_artisan().0, 1);

        let UpdateEvent::GenerationEvolved(summary) = poll(&mut orchestrator) else {
            panic!("expected the generation to evolve");
        };
        assert_eq!(summary.generation, 0);
        assert!(summary.min <= summary.mean && summary.mean <= summary.max);
        assert_eq!(orchestrator.generation(), 1);
        assert_eq!(orchestrator.population().len(), 2);
        assert_eq!(orchestrator.current_artisan().0, 0);

        orchestrator.stop();
        assert!(orchestrator.update().is_pending());
    }

    #[test]
    fn test_stop_then_start_resumes_training() {
        let mut orchestrator =
            Orchestrator::new(small_config(), vec![Scripted::new(1, 0.0)], RandomArtisan).unwrap();
        orchestrator.start();
        assert!(poll(&mut orchestrator).is_generation_evolved());

        orchestrator.stop();
        assert!(orchestrator.statuses().iter().all(|s| !s.is_in_progress()));
        assert!(orchestrator.update().is_pending());
        assert_eq!(orchestrator.cells().len(), 4);

        orchestrator.start();
        assert!(poll(&mut orchestrator).is_generation_evolved());
        assert_eq!(orchestrator.generation(), 2);
    }

    #[test]
    fn test_restart_replaces_queued_round() {
        let plays = Arc::new(AtomicUsize::new(0));
        let mut orchestrator = counting_orchestrator(3, &plays, None);

        // Occupy the only worker so every game job stays queued.
        let (release, blocked) = channel::bounded::<()>(0);
        let pool = orchestrator.pool.insert(WorkerPool::new(1));
        pool.insert(move || {
            let _ = blocked.recv();
        });

        orchestrator.start();
        orchestrator.restart();
        assert!(orchestrator.statuses().iter().all(|s| s.is_not_started()));
        drop(release);

        assert_eq!(
            poll(&mut orchestrator),
            UpdateEvent::ArtisanEvaluated {
                index: 0,
                fitness: 15.0
            }
        );
        assert_eq!(plays.load(Ordering::SeqCst), 3);
        assert!(orchestrator.last_outcomes().iter().all(|o| o.turns_played == 0));
    }

    #[test]
    fn test_restart_is_refused_before_start_and_mid_game() {
        let plays = Arc::new(AtomicUsize::new(0));
        let (release, gate) = channel::bounded::<()>(0);
        let mut orchestrator = counting_orchestrator(2, &plays, Some(gate));

        orchestrator.restart();
        assert!(orchestrator.pool.is_none());
        assert!(orchestrator.update().is_pending());

        orchestrator.start();
        wait_until(|| plays.load(Ordering::SeqCst) == 1);
        let boards = orchestrator.cells();
        orchestrator.restart();
        assert_eq!(
            orchestrator.statuses(),
            [GameStatus::InProgress, GameStatus::NotStarted]
        );
        assert_eq!(orchestrator.cells(), boards);

        drop(release);
        assert_eq!(
            poll(&mut orchestrator),
            UpdateEvent::ArtisanEvaluated {
                index: 0,
                fitness: 10.0
            }
        );
        assert_eq!(plays.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stop_mid_round_replays_skipped_games_on_start() {
        let plays = Arc::new(AtomicUsize::new(0));
        let (release, gate) = channel::bounded::<()>(0);
        let mut orchestrator = counting_orchestrator(3, &plays, Some(gate));

        orchestrator.start();
        wait_until(|| plays.load(Ordering::SeqCst) == 1);

        // Cancel while game 0 is still running so games 1 and 2 stay queued.
        orchestrator.pool.as_mut().unwrap().cancel_all();
        drop(release);
        orchestrator.stop();
        assert_eq!(
            orchestrator.statuses(),
            [GameStatus::Done, GameStatus::NotStarted, GameStatus::NotStarted]
        );
        assert!(orchestrator.update().is_pending());
        assert_eq!(plays.load(Ordering::SeqCst), 1);

        orchestrator.start();
        assert_eq!(
            poll(&mut orchestrator),
            UpdateEvent::ArtisanEvaluated {
                index: 0,
                fitness: 15.0
            }
        );
        assert_eq!(plays.load(Ordering::SeqCst), 4);
        assert_eq!(orchestrator.generation(), 0);
    }

    #[derive(Debug, Clone)]
    struct Panicking;

    impl Artisan for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn play(&self, _observation: &Observation) -> Option<ColorIndex> {
            panic!("artisan exploded");
        }
    }

    impl Evolvable for Panicking {
        fn fitness(&self) -> f64 {
            0.0
        }

        fn set_fitness(&mut self, _fitness: f64) {}

        fn mutate_random<R>(&mut self, _likelihood: f64, _rng: &mut R)
        where
            R: Rng + ?Sized,
        {
        }

        fn mutate_by_delta<R>(&mut self, _likelihood: f64, _delta: f64, _rng: &mut R)
        where
            R: Rng + ?Sized,
        {
        }

        fn crossover<R>(a: &Self, _b: &Self, _a_bias: f64, _rng: &mut R) -> Self
        where
            R: Rng + ?Sized,
        {
            a.clone()
        }
    }

    #[test]
    fn test_panicking_artisan_still_completes_round() {
        let mut orchestrator = Orchestrator::new(small_config(), vec![Panicking], RandomArtisan).unwrap();
        orchestrator.start();
        assert!(poll(&mut orchestrator).is_generation_evolved());
        for outcome in orchestrator.last_outcomes() {
            assert_eq!(outcome.owned_cells, [5, 5]);
            assert_eq!(outcome.turns_played, 0);
        }
    }

    #[test]
    fn test_new_rejects_invalid_setups() {
        let no_games = OrchestratorConfig {
            n_games: 0,
            ..small_config()
        };
        assert_eq!(
            Orchestrator::new(no_games, vec![Scripted::default()], RandomArtisan).err(),
            Some(OrchestratorError::NoGames)
        );
        assert_eq!(
            Orchestrator::<Scripted>::new(small_config(), vec![], RandomArtisan).err(),
            Some(OrchestratorError::EmptyPopulation)
        );

        let tiny_board = OrchestratorConfig {
            board: BoardConfig {
                width: 2,
                ..BoardConfig::default()
            },
            ..small_config()
        };
        assert!(matches!(
            Orchestrator::new(tiny_board, vec![Scripted::default()], RandomArtisan),
            Err(OrchestratorError::InvalidBoard(_))
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{ "n_games": 8, "board": { "width": 12 } }"#).unwrap();
        assert_eq!(config.n_games, 8);
        assert_eq!(config.n_threads, 4);
        assert_eq!(config.board.width, 12);
        assert_eq!(config.board.height, 40);
        assert_eq!(config.evolution, PopulationEvolver::default());
    }
}
