//! In-memory named-data fabric with selector matching.

use std::sync::{Arc, Mutex};

use spanlock_core::{Face, FaceReply};
use spanlock_proto::{ChildSelector, Data, Interest, Name};

/// A simulated fabric shared by every engine in a test.
///
/// Interests resolve against a directory of published data objects using the
/// same matching the engines rely on in production: the interest name must be
/// a prefix of the data name, the component following the prefix must pass
/// the exclude filter, and ties break by child selector. Unsatisfied
/// interests time out, mirroring a fabric that silently drops them.
///
/// Scripted replies (served before the directory is consulted) and
/// delegation requirements simulate stale caches, outages, and routes that
/// only work through a forwarding hint.
#[derive(Clone, Default)]
pub struct SimFace {
    inner: Arc<Mutex<SimFaceInner>>,
}

#[derive(Default)]
struct SimFaceInner {
    directory: Vec<Data>,
    scripts: Vec<Script>,
    delegation_rules: Vec<DelegationRule>,
    log: Vec<Interest>,
}

struct Script {
    prefix: Name,
    replies: Vec<FaceReply>,
}

struct DelegationRule {
    prefix: Name,
    required_index: usize,
}

impl SimFace {
    /// An empty fabric.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a data object into the directory.
    pub fn publish(&self, data: Data) {
        self.lock().directory.push(data);
    }

    /// Serve `replies` (in order) to the next interests whose name starts
    /// with `prefix`, before consulting the directory. Use for stale cached
    /// responses, nacks and timeouts.
    pub fn script(&self, prefix: &Name, replies: Vec<FaceReply>) {
        self.lock().scripts.push(Script {
            prefix: prefix.clone(),
            replies,
        });
    }

    /// Interests under `prefix` are nacked unless they select delegation
    /// `required_index` of an attached link.
    pub fn require_delegation(&self, prefix: &Name, required_index: usize) {
        self.lock().delegation_rules.push(DelegationRule {
            prefix: prefix.clone(),
            required_index,
        });
    }

    /// Every interest expressed so far, in order.
    pub fn log(&self) -> Vec<Interest> {
        self.lock().log.clone()
    }

    /// Number of interests expressed so far.
    pub fn interest_count(&self) -> usize {
        self.lock().log.len()
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, SimFaceInner> {
        self.inner.lock().expect("Mutex poisoned")
    }
}

impl Face for SimFace {
    async fn express_interest(&self, interest: &Interest) -> FaceReply {
        let mut inner = self.lock();
        inner.log.push(interest.clone());

        // Scripted replies win over everything.
        for script in &mut inner.scripts {
            if script.prefix.is_prefix_of(&interest.name) && !script.replies.is_empty() {
                return script.replies.remove(0);
            }
        }

        // Delegation-only reachability.
        for rule in &inner.delegation_rules {
            if rule.prefix.is_prefix_of(&interest.name)
                && interest.selected_delegation != Some(rule.required_index)
            {
                return FaceReply::Nack;
            }
        }

        // Directory lookup with selector matching.
        let mut best: Option<&Data> = None;
        for data in &inner.directory {
            if !interest.matches_data(data) {
                continue;
            }
            best = Some(match best {
                None => data,
                Some(current) => pick(interest, current, data),
            });
        }

        match best {
            Some(data) => FaceReply::Data(data.clone()),
            None => FaceReply::Timeout,
        }
    }
}

/// Choose between two matching data objects per the interest's child
/// selector, comparing the component that follows the interest name.
fn pick<'a>(interest: &Interest, current: &'a Data, candidate: &'a Data) -> &'a Data {
    let index = interest.name.len() as isize;
    let current_child = current.name.get(index);
    let candidate_child = candidate.name.get(index);

    let prefer_candidate = match interest.child_selector {
        Some(ChildSelector::Rightmost) => candidate_child > current_child,
        _ => candidate_child < current_child,
    };
    if prefer_candidate {
        candidate
    } else {
        current
    }
}
