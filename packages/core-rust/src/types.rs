//! Small shared aliases used across the dispatch layer.

use std::collections::HashMap;

/// Message headers, passed through from the transport to the handler
/// untouched. Always present; an empty map means the message carried none.
pub type Headers = HashMap<String, String>;
