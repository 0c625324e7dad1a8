use std::collections::HashMap;

/// Bare `host:port` string a peer binds to and is addressed by.
pub type Address = String;

/// Position on the identifier ring, an integer in `[0, 2^M)`.
pub type HashPos = u16;

/// Local key value storage, authoritative for the arc this node owns.
pub type KvStore = HashMap<String, String>;
