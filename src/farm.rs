//! The polling control loop: classify, act, wait, repeat.
//!
//! One outstanding tick at a time; the next tick is scheduled only after the
//! current one (including its internal pacing delays) has finished. `stop()`
//! prevents future ticks from being scheduled but lets an in-flight tick run
//! to completion, so callers must tolerate up to one tick of trailing
//! activity.

use crate::classify::{classify, PageState};
use crate::config::FarmOptions;
use crate::page::ChallengePage;
use crate::snapshot::PageSnapshot;
use crate::solve::{Outcome, Solver};
use crate::status::FarmStats;
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Running totals for one farming session. Owned by the controller, mutated
/// only on its tick; the status display reads cloned snapshots. The session
/// outlives stop/start cycles — only `started_at` is reset on restart.
#[derive(Debug)]
pub struct FarmSession {
    pub running: bool,
    pub xp_earned: u32,
    pub lessons_completed: u32,
    pub correct_answers: u32,
    pub target_xp: u32,
    started_at: Instant,
    started_at_wall: DateTime<Local>,
}

impl FarmSession {
    fn new(target_xp: u32) -> Self {
        Self {
            running: false,
            xp_earned: 0,
            lessons_completed: 0,
            correct_answers: 0,
            target_xp,
            started_at: Instant::now(),
            started_at_wall: Local::now(),
        }
    }

    /// Point-in-time copy for display.
    pub fn stats(&self) -> FarmStats {
        FarmStats {
            running: self.running,
            xp_earned: self.xp_earned,
            lessons_completed: self.lessons_completed,
            correct_answers: self.correct_answers,
            target_xp: self.target_xp,
            elapsed: self.started_at.elapsed(),
            started_at: self.started_at_wall,
        }
    }
}

/// Cloneable surface the control panel binds to: stop, read stats.
#[derive(Clone)]
pub struct FarmHandle {
    session: Arc<Mutex<FarmSession>>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl FarmHandle {
    /// Request a stop. A tick already underway finishes; no further tick is
    /// scheduled. Calling this while already stopped only logs a warning.
    pub fn stop(&self) {
        {
            let session = lock(&self.session);
            if !session.running {
                warn!("farm is not running");
                return;
            }
        }
        lock(&self.cancel).cancel();
        info!("stop requested, current tick will finish");
    }

    pub fn stats(&self) -> FarmStats {
        lock(&self.session).stats()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.session).running
    }
}

/// Drives the observe → classify → solve loop against one page.
pub struct FarmController<P: ChallengePage> {
    page: Arc<P>,
    opts: FarmOptions,
    solver: Solver,
    session: Arc<Mutex<FarmSession>>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl<P: ChallengePage> FarmController<P> {
    pub fn new(page: Arc<P>, opts: FarmOptions) -> Self {
        let solver = Solver::new(&opts);
        let session = Arc::new(Mutex::new(FarmSession::new(opts.target_xp)));
        Self {
            page,
            opts,
            solver,
            session,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn handle(&self) -> FarmHandle {
        FarmHandle {
            session: Arc::clone(&self.session),
            cancel: Arc::clone(&self.cancel),
        }
    }

    pub fn stats(&self) -> FarmStats {
        lock(&self.session).stats()
    }

    /// Run until the XP goal is reached or [`FarmHandle::stop`] is called.
    /// Starting while already running warns and returns immediately. The
    /// session can be re-run after it stops.
    pub async fn run(&self) -> FarmStats {
        let Some(token) = self.begin() else {
            return self.stats();
        };
        loop {
            if token.is_cancelled() {
                break;
            }
            if !self.tick().await {
                break;
            }
            let delay = self.opts.action_delay.sample();
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.finish()
    }

    fn begin(&self) -> Option<CancellationToken> {
        let mut session = lock(&self.session);
        if session.running {
            warn!("farm already running");
            return None;
        }
        session.running = true;
        session.started_at = Instant::now();
        session.started_at_wall = Local::now();
        info!("farm started (target: {} XP)", session.target_xp);
        let token = CancellationToken::new();
        *lock(&self.cancel) = token.clone();
        Some(token)
    }

    fn finish(&self) -> FarmStats {
        let mut session = lock(&self.session);
        session.running = false;
        let stats = session.stats();
        info!(
            "farm stopped: {} XP, {} lessons",
            stats.xp_earned, stats.lessons_completed
        );
        stats
    }

    /// One observation-action cycle. Returns false once the goal is reached.
    /// Nothing in here may escape as an error: a failed snapshot or click is
    /// logged and the loop simply re-polls.
    async fn tick(&self) -> bool {
        {
            let session = lock(&self.session);
            if session.xp_earned >= session.target_xp {
                info!("goal reached: {} XP", session.xp_earned);
                return false;
            }
        }

        let snap = match self.page.snapshot().await {
            Ok(snap) => snap,
            Err(e) => {
                warn!("snapshot failed: {e}");
                return true;
            }
        };

        let state = classify(&snap);
        debug!("tick: {state}");
        match state {
            PageState::LessonComplete => self.complete_lesson(&snap).await,
            PageState::ChallengeInProgress => {
                let report = self.solver.solve(self.page.as_ref(), &snap).await;
                if report.confident_answer {
                    lock(&self.session).correct_answers += 1;
                }
                match report.outcome {
                    Outcome::Solved => {}
                    Outcome::NotApplicable => debug!("nothing to do on this challenge"),
                    // no retry-in-place: worst case is one wasted tick
                    Outcome::Failed => warn!("solve failed, moving on"),
                }
            }
            PageState::Idle => self.start_activity(&snap).await,
        }
        true
    }

    async fn complete_lesson(&self, snap: &PageSnapshot) {
        let (xp, lessons) = {
            let mut session = lock(&self.session);
            session.lessons_completed += 1;
            session.xp_earned += self.opts.xp_per_lesson;
            (session.xp_earned, session.lessons_completed)
        };
        info!("lesson complete: {lessons} lessons, {xp} XP total");
        if let Some(button) = &snap.continue_button {
            self.opts.action_delay.pause().await;
            match self.page.click(&button.selector).await {
                Ok(true) => {}
                Ok(false) => debug!("continue control disappeared before the click"),
                Err(e) => warn!("continue click failed: {e}"),
            }
        }
    }

    /// Start a new lesson or practice activity from the idle page: global
    /// practice first, then any skill/lesson link plus its start
    /// confirmation if one appears.
    async fn start_activity(&self, snap: &PageSnapshot) {
        if let Some(practice) = &snap.practice {
            info!("starting practice session");
            self.opts.action_delay.pause().await;
            if let Err(e) = self.page.click(&practice.selector).await {
                warn!("practice click failed: {e}");
            }
            return;
        }
        let Some(link) = snap.lesson_links.first() else {
            warn!("no available lessons found");
            return;
        };
        info!("starting lesson");
        self.opts.action_delay.pause().await;
        match self.page.click(&link.selector).await {
            Ok(true) => {
                self.opts.settle_delay.pause().await;
                match self.page.snapshot().await {
                    Ok(after) => {
                        if let Some(start) = &after.start_button {
                            if let Err(e) = self.page.click(&start.selector).await {
                                warn!("start click failed: {e}");
                            }
                        }
                    }
                    Err(e) => debug!("post-entry snapshot failed: {e}"),
                }
            }
            Ok(false) => debug!("lesson link disappeared before the click"),
            Err(e) => warn!("lesson click failed: {e}"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
