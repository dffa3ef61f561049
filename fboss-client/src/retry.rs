// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! A bounded, fixed-delay retry policy.
//!
//! The agent and the qsfp_service are briefly unreachable after a restart,
//! and a few of their calls fail transiently while ports are being
//! reprogrammed. Callers wrap those calls in a [`RetryPolicy`], a constant
//! `backoff` capped at a number of attempts.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::backoff::Constant;
use slog::debug;
use slog::warn;
use slog::Logger;

/// Retry an operation up to `max_attempts` times, sleeping `delay` between
/// attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

// A constant backoff that stops once `max_retries` delays have been handed
// out.
struct BoundedConstant {
    delay: Constant,
    max_retries: u32,
    remaining: u32,
}

impl Backoff for BoundedConstant {
    fn reset(&mut self) {
        self.remaining = self.max_retries;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.delay.next_backoff()
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
        }
    }

    /// The policy used when building topology maps for display: three
    /// attempts, 100ms apart.
    pub const fn topology() -> Self {
        Self::new(3, Duration::from_millis(100))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    fn backoff(&self) -> BoundedConstant {
        let max_retries = self.attempts() - 1;
        BoundedConstant {
            delay: Constant::new(self.delay),
            max_retries,
            remaining: max_retries,
        }
    }

    /// Run `op` until it succeeds, `retryable` rejects its error, or the
    /// attempts are exhausted. The error from the last attempt is returned.
    ///
    /// A policy with `max_attempts` of zero still runs the operation once.
    pub async fn retry<T, E, F, Fut, P>(
        &self,
        log: &Logger,
        what: &str,
        mut op: F,
        retryable: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: fmt::Display,
    {
        let max_attempts = self.attempts();
        let retryable = &retryable;
        let mut attempt = 0;
        let mut failures = 0;
        let result = backoff::future::retry_notify(
            self.backoff(),
            || {
                attempt += 1;
                let fut = op();
                async move {
                    fut.await.map_err(|e| {
                        if retryable(&e) {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: E, delay: Duration| {
                failures += 1;
                debug!(log, "{what} failed, retrying";
                    "attempt" => failures,
                    "max_attempts" => max_attempts,
                    "retry_after" => ?delay,
                    "error" => %e,
                );
            },
        )
        .await;
        if let Err(e) = &result {
            if attempt > 1 {
                warn!(log, "{what} failed, giving up";
                    "attempts" => attempt,
                    "error" => %e,
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::RetryPolicy;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    const FAST: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(1));

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = FAST
            .retry(
                &logger(),
                "fetch",
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n < 3 {
                            Err(format!("transient {n}"))
                        } else {
                            Ok(42)
                        }
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = FAST
            .retry(
                &logger(),
                "fetch",
                || {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move { Err(format!("transient {n}")) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err(String::from("transient 3")));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_returned_at_once() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = FAST
            .retry(
                &logger(),
                "fetch",
                || {
                    calls.set(calls.get() + 1);
                    async { Err(String::from("fatal")) }
                },
                |e| e != "fatal",
            )
            .await;
        assert_eq!(result, Err(String::from("fatal")));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let calls = Cell::new(0);
        let result: Result<(), String> = policy
            .retry(
                &logger(),
                "fetch",
                || {
                    calls.set(calls.get() + 1);
                    async { Err(String::from("down")) }
                },
                |_| true,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
