use std::collections::HashMap;

use mumps_model::Value;
use mumps_txn::Transaction;

/// Per-connection state: local variables and, when one is open, the
/// single transaction this session is staging writes into. Neither field
/// is shared with any other session.
pub struct Session {
    pub id: String,
    pub local_vars: HashMap<String, Value>,
    pub transaction: Option<Transaction>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Session {
            id: id.into(),
            local_vars: HashMap::new(),
            transaction: None,
        }
    }

    pub fn set_local(&mut self, name: &str, value: Value) {
        self.local_vars.insert(name.to_string(), value);
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.local_vars.get(name).cloned()
    }
}
