//! Key-Value Backend Module
//!
//! The narrow contract the cache layer needs from a key-value store:
//! `GET`, `SETEX`, `DEL`, `KEYS pattern` and `PING`, over string keys and
//! string (JSON) values.

use async_trait::async_trait;
use thiserror::Error;

// == Backend Error ==
/// Failure reported by a key-value backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Error returned by the Redis client
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend did not answer in time
    #[error("backend timed out after {0} ms")]
    Timeout(u64),

    /// The backend is not reachable at all
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

// == KV Backend ==
/// Key-value store reached by the cache accessor.
///
/// Implementations must be safe to share between tasks; concurrency control
/// is the backend's own business.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Short name used in logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// `GET key`
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// `SETEX key ttl value`
    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> BackendResult<()>;

    /// `DEL key...`, returns the number of keys removed.
    async fn del(&self, keys: &[String]) -> BackendResult<usize>;

    /// `KEYS pattern`
    async fn keys(&self, pattern: &str) -> BackendResult<Vec<String>>;

    /// `PING`
    async fn ping(&self) -> BackendResult<()>;
}

// == Unavailable Backend ==
/// Backend that fails every call.
///
/// Stands in for Redis when the initial connection could not be made, so the
/// service still starts and serves everything from the store of record.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> BackendResult<T> {
        Err(BackendError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl KvBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn get(&self, _key: &str) -> BackendResult<Option<String>> {
        self.fail()
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl_secs: u64) -> BackendResult<()> {
        self.fail()
    }

    async fn del(&self, _keys: &[String]) -> BackendResult<usize> {
        self.fail()
    }

    async fn keys(&self, _pattern: &str) -> BackendResult<Vec<String>> {
        self.fail()
    }

    async fn ping(&self) -> BackendResult<()> {
        self.fail()
    }
}

/// Redis-style glob matching (`*`, `?`, `[...]`, `\` escapes).
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();
    glob_match_at(&pattern, &key)
}

fn glob_match_at(pattern: &[char], key: &[char]) -> bool {
    let (mut p, mut k) = (0usize, 0usize);
    // Backtracking point for the most recent `*`.
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        if p < pattern.len() {
            match pattern[p] {
                '*' => {
                    star = Some((p, k));
                    p += 1;
                    continue;
                }
                '?' => {
                    p += 1;
                    k += 1;
                    continue;
                }
                '[' => {
                    if let Some((matched, next)) = match_class(pattern, p, key[k]) {
                        if matched {
                            p = next;
                            k += 1;
                            continue;
                        }
                    }
                }
                '\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == key[k] {
                        p += 2;
                        k += 1;
                        continue;
                    }
                }
                c => {
                    if c == key[k] {
                        p += 1;
                        k += 1;
                        continue;
                    }
                }
            }
        }

        match star {
            Some((star_p, star_k)) => {
                p = star_p + 1;
                k = star_k + 1;
                star = Some((star_p, star_k + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches `c` against the class starting at `pattern[start] == '['`.
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` when the class is unterminated.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = i < pattern.len() && pattern[i] == '^';
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = (pattern[i], pattern[i + 2]);
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    if i >= pattern.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}
