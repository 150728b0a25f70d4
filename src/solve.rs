//! Challenge detection and solving.
//!
//! A challenge is matched against a fixed, ordered catalog of markup patterns
//! and handled by the first variant that applies. The ordering is an
//! invariant: a ready advance control always wins, because finishing the
//! current interaction takes priority over starting a new one.

use crate::config::{DelayRange, FarmOptions};
use crate::inspect;
use crate::page::ChallengePage;
use crate::snapshot::{ChoiceInfo, PageSnapshot, TokenInfo};
use crate::Result;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Interaction types the solver knows, in match-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeType {
    /// A ready check/next control: click it and move on.
    ConfirmAdvance,
    MultipleChoice,
    /// Ordered token assembly.
    WordBank,
    TokenPairing,
    /// Unsupported; skipped.
    FreeText,
    TranslateChoice,
    /// Unsupported; skipped.
    AudioPrompt,
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChallengeType::ConfirmAdvance => "confirm advance",
            ChallengeType::MultipleChoice => "multiple choice",
            ChallengeType::WordBank => "word bank",
            ChallengeType::TokenPairing => "token pairing",
            ChallengeType::FreeText => "free text",
            ChallengeType::TranslateChoice => "translate choice",
            ChallengeType::AudioPrompt => "audio prompt",
        };
        f.write_str(name)
    }
}

/// What a solve attempt amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Solved,
    NotApplicable,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Solved => write!(f, "solved"),
            Outcome::NotApplicable => write!(f, "not applicable"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one solve invocation.
#[derive(Debug, Clone, Copy)]
pub struct SolveReport {
    pub outcome: Outcome,
    pub challenge: Option<ChallengeType>,
    /// The clicked answer came from a positive-confidence heuristic; the
    /// blind fallback and random picks never set this.
    pub confident_answer: bool,
}

impl SolveReport {
    fn not_applicable(challenge: Option<ChallengeType>) -> Self {
        Self {
            outcome: Outcome::NotApplicable,
            challenge,
            confident_answer: false,
        }
    }

    fn solved(challenge: ChallengeType) -> Self {
        Self {
            outcome: Outcome::Solved,
            challenge: Some(challenge),
            confident_answer: false,
        }
    }
}

/// Determine the challenge's interaction type. First matching variant in the
/// fixed catalog order wins.
pub fn detect_challenge(snap: &PageSnapshot) -> Option<ChallengeType> {
    if snap.advance_ready() {
        return Some(ChallengeType::ConfirmAdvance);
    }
    if !snap.choices.is_empty() {
        return Some(ChallengeType::MultipleChoice);
    }
    if !snap.word_tokens.is_empty() {
        return Some(ChallengeType::WordBank);
    }
    if !snap.pair_tokens.is_empty() {
        return Some(ChallengeType::TokenPairing);
    }
    if snap.text_input {
        return Some(ChallengeType::FreeText);
    }
    if !snap.translate_choices.is_empty() {
        return Some(ChallengeType::TranslateChoice);
    }
    if snap.audio_prompt {
        return Some(ChallengeType::AudioPrompt);
    }
    None
}

/// The choice the answer heuristics settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerCandidate {
    pub index: usize,
    pub confident: bool,
}

/// Pick an answer among discrete choices.
///
/// Heuristic chain, highest confidence first: explicit data-attribute flag →
/// accessibility-label match → framework-internal `correct` prop → blind
/// fallback to the first candidate. Guaranteed to yield a candidate whenever
/// at least one exists; only the first three rungs claim confidence. In safe
/// mode the chain is bypassed and a candidate is drawn uniformly at random.
pub fn choose_answer<R: Rng>(
    candidates: &[ChoiceInfo],
    safe_mode: bool,
    rng: &mut R,
) -> Option<AnswerCandidate> {
    if candidates.is_empty() {
        return None;
    }
    if safe_mode {
        return Some(AnswerCandidate {
            index: rng.gen_range(0..candidates.len()),
            confident: false,
        });
    }
    if let Some(index) = candidates.iter().position(|c| c.marked_correct) {
        return Some(AnswerCandidate {
            index,
            confident: true,
        });
    }
    if let Some(index) = candidates
        .iter()
        .position(|c| c.aria_label.as_deref().is_some_and(label_marks_correct))
    {
        return Some(AnswerCandidate {
            index,
            confident: true,
        });
    }
    if let Some(index) = candidates
        .iter()
        .position(|c| c.record.as_ref().is_some_and(inspect::record_marks_correct))
    {
        return Some(AnswerCandidate {
            index,
            confident: true,
        });
    }
    Some(AnswerCandidate {
        index: 0,
        confident: false,
    })
}

fn label_marks_correct(label: &str) -> bool {
    let lower = label.to_lowercase();
    lower.contains("correct") && !lower.contains("incorrect")
}

/// Click order for word-bank tokens: ascending by order marker, unmarked
/// tokens after all marked ones (original relative order preserved), disabled
/// tokens excluded. Returns indices into the token slice.
pub fn word_bank_click_order(tokens: &[TokenInfo]) -> Vec<usize> {
    const UNMARKED_LAST: i64 = i64::MAX;
    let mut order: Vec<usize> = (0..tokens.len()).filter(|&i| tokens[i].enabled).collect();
    order.sort_by_key(|&i| tokens[i].order.unwrap_or(UNMARKED_LAST));
    order
}

/// Executes the per-type solving strategies against a page.
pub struct Solver {
    action_delay: DelayRange,
    token_delay: DelayRange,
    safe_mode: bool,
    in_flight: AtomicBool,
}

impl Solver {
    pub fn new(opts: &FarmOptions) -> Self {
        Self {
            action_delay: opts.action_delay,
            token_delay: opts.token_delay,
            safe_mode: opts.safe_mode,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Solve whatever the snapshot shows. At most one invocation runs at a
    /// time; an overlapping call is skipped outright, never queued —
    /// concurrent pointer events on the same widget would corrupt the host
    /// page's interaction state. Errors during DOM interaction are caught
    /// here and downgraded to [`Outcome::Failed`]; they never reach the
    /// caller.
    pub async fn solve(&self, page: &dyn ChallengePage, snap: &PageSnapshot) -> SolveReport {
        let Some(_guard) = SolveGuard::acquire(&self.in_flight) else {
            warn!("solve already in progress, skipping overlapping invocation");
            return SolveReport::not_applicable(None);
        };

        let Some(challenge) = detect_challenge(snap) else {
            debug!("no known challenge pattern on page");
            return SolveReport::not_applicable(None);
        };

        match self.act(page, snap, challenge).await {
            Ok(report) => report,
            Err(e) => {
                warn!("{challenge} interaction failed: {e}");
                SolveReport {
                    outcome: Outcome::Failed,
                    challenge: Some(challenge),
                    confident_answer: false,
                }
            }
        }
    }

    async fn act(
        &self,
        page: &dyn ChallengePage,
        snap: &PageSnapshot,
        challenge: ChallengeType,
    ) -> Result<SolveReport> {
        match challenge {
            ChallengeType::ConfirmAdvance => {
                let Some(advance) = &snap.advance else {
                    return Ok(SolveReport::not_applicable(Some(challenge)));
                };
                self.action_delay.pause().await;
                if page.click(&advance.selector).await? {
                    info!("clicked advance control");
                    Ok(SolveReport::solved(challenge))
                } else {
                    Ok(SolveReport::not_applicable(Some(challenge)))
                }
            }
            ChallengeType::MultipleChoice => self.answer_choices(page, &snap.choices, challenge).await,
            ChallengeType::TranslateChoice => {
                self.answer_choices(page, &snap.translate_choices, challenge)
                    .await
            }
            ChallengeType::WordBank => {
                let order = word_bank_click_order(&snap.word_tokens);
                if order.is_empty() {
                    return Ok(SolveReport::not_applicable(Some(challenge)));
                }
                self.action_delay.pause().await;
                let mut clicked = 0usize;
                for i in order {
                    if page.click(&snap.word_tokens[i].selector).await? {
                        clicked += 1;
                    }
                    self.token_delay.pause().await;
                }
                if clicked == 0 {
                    return Ok(SolveReport::not_applicable(Some(challenge)));
                }
                info!("assembled {clicked} word-bank tokens");
                Ok(SolveReport::solved(challenge))
            }
            ChallengeType::TokenPairing => {
                let pairs: Vec<_> = snap.pair_tokens.chunks_exact(2).collect();
                if pairs.is_empty() {
                    return Ok(SolveReport::not_applicable(Some(challenge)));
                }
                self.action_delay.pause().await;
                let mut clicked = 0usize;
                for pair in pairs {
                    for token in pair {
                        if page.click(&token.selector).await? {
                            clicked += 1;
                        }
                        self.token_delay.pause().await;
                    }
                }
                if clicked == 0 {
                    return Ok(SolveReport::not_applicable(Some(challenge)));
                }
                info!("paired {clicked} tokens");
                Ok(SolveReport::solved(challenge))
            }
            ChallengeType::FreeText | ChallengeType::AudioPrompt => {
                let Some(skip) = &snap.skip else {
                    debug!("{challenge} unsupported and no skip control present");
                    return Ok(SolveReport::not_applicable(Some(challenge)));
                };
                self.action_delay.pause().await;
                if page.click(&skip.selector).await? {
                    info!("skipped {challenge} challenge");
                    Ok(SolveReport::solved(challenge))
                } else {
                    Ok(SolveReport::not_applicable(Some(challenge)))
                }
            }
        }
    }

    async fn answer_choices(
        &self,
        page: &dyn ChallengePage,
        candidates: &[ChoiceInfo],
        challenge: ChallengeType,
    ) -> Result<SolveReport> {
        let answer = choose_answer(candidates, self.safe_mode, &mut rand::thread_rng());
        let Some(answer) = answer else {
            return Ok(SolveReport::not_applicable(Some(challenge)));
        };
        self.action_delay.pause().await;
        if !page.click(&candidates[answer.index].selector).await? {
            return Ok(SolveReport::not_applicable(Some(challenge)));
        }
        if answer.confident {
            info!("answered {challenge} (confident)");
        } else {
            info!("answered {challenge} (blind pick)");
        }
        self.token_delay.pause().await;
        Ok(SolveReport {
            outcome: Outcome::Solved,
            challenge: Some(challenge),
            confident_answer: answer.confident,
        })
    }
}

/// RAII flag for the single-in-flight-solve invariant.
struct SolveGuard<'a>(&'a AtomicBool);

impl<'a> SolveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SolveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
