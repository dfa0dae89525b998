use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use loyalty_common::Points;

use crate::{
    db_types::OrderNumber,
    oracle::{AccrualOracle, OracleError, OracleStatus, Verdict},
};

/// One scripted answer from the fake oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// The oracle does not know the order yet (`204`).
    NoVerdict,
    Status(OracleStatus),
    Processed(Points),
    /// The oracle cannot be reached.
    Unreachable,
}

#[derive(Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    calls: usize,
}

/// An in-memory [`AccrualOracle`] that replays scripted answers per order number.
///
/// Replies are consumed in order and the last one repeats forever. Orders without a script get
/// [`ScriptedReply::NoVerdict`].
#[derive(Clone, Default)]
pub struct ScriptedOracle {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, number: &OrderNumber, replies: Vec<ScriptedReply>) -> &Self {
        let mut scripts = self.scripts.lock().expect("oracle script lock poisoned");
        scripts.entry(number.as_str().to_string()).or_default().replies = replies.into();
        self
    }

    /// How many times the oracle was asked about `number`.
    pub fn calls_for(&self, number: &OrderNumber) -> usize {
        let scripts = self.scripts.lock().expect("oracle script lock poisoned");
        scripts.get(number.as_str()).map(|s| s.calls).unwrap_or_default()
    }

    fn next_reply(&self, number: &OrderNumber) -> ScriptedReply {
        let mut scripts = self.scripts.lock().expect("oracle script lock poisoned");
        let script = scripts.entry(number.as_str().to_string()).or_default();
        script.calls += 1;
        match script.replies.len() {
            0 => ScriptedReply::NoVerdict,
            1 => script.replies[0].clone(),
            _ => script.replies.pop_front().unwrap_or(ScriptedReply::NoVerdict),
        }
    }
}

impl AccrualOracle for ScriptedOracle {
    async fn fetch_verdict(&self, number: &OrderNumber) -> Result<Option<Verdict>, OracleError> {
        match self.next_reply(number) {
            ScriptedReply::NoVerdict => Ok(None),
            ScriptedReply::Status(status) => Ok(Some(Verdict::with_status(number, status))),
            ScriptedReply::Processed(accrual) => Ok(Some(Verdict::processed(number, accrual))),
            ScriptedReply::Unreachable => Err(OracleError::Unreachable("connection refused".to_string())),
        }
    }
}
