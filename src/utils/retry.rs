//! 通用重试工具
//!
//! 所有门户步骤共用同一个重试实现：固定次数、每次失败后等待、最终返回带标签的错误。

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{AutomationError, Result};

/// 两次尝试之间的等待策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// 固定间隔
    Fixed(Duration),
    /// 指数退避，带 0..jitter 的随机抖动
    Exponential {
        initial: Duration,
        factor: f64,
        max: Duration,
        jitter: Duration,
    },
}

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(2000))
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                initial,
                factor: 2.0,
                max,
                jitter: initial / 2,
            },
        }
    }

    /// 第 `attempt` 次失败（从 1 开始）之后的等待时间
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                factor,
                max,
                jitter,
            } => {
                // 先在 f64 上截断，避免 Duration 乘法溢出
                let exp = factor.powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
                let secs = (initial.as_secs_f64() * exp).min(max.as_secs_f64()).max(0.0);
                let base = Duration::try_from_secs_f64(secs).unwrap_or(max);
                let extra = if jitter.is_zero() {
                    Duration::ZERO
                } else {
                    rand::rng().random_range(Duration::ZERO..jitter)
                };
                base + extra
            }
        }
    }
}

/// 执行 `operation`，失败时按策略等待并重试
///
/// 用尽次数后返回 `RetryExhausted`，其中包含 `label` 和最后一次错误。
/// 取消或连接断开不会重试，直接返回。
pub async fn retry<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(AutomationError::Cancelled);
        }

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if attempt >= policy.max_attempts {
            warn!("{}: 第 {}/{} 次尝试失败，放弃: {}", label, attempt, policy.max_attempts, err);
            return Err(AutomationError::RetryExhausted {
                label: label.to_string(),
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = policy.delay_after(attempt);
        debug!(
            "{}: 第 {}/{} 次尝试失败 ({}), {}ms 后重试",
            label,
            attempt,
            policy.max_attempts,
            err,
            delay.as_millis()
        );
        sleep_or_cancel(delay, cancel).await?;
    }
}

/// 可取消的等待
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(AutomationError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn flaky(failures: u32, calls: &AtomicU32) -> Result<&'static str> {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= failures {
            Err(AutomationError::Driver(format!("boom #{}", n)))
        } else {
            Ok("done")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_last_attempt() {
        let calls = &AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let out = retry(RetryPolicy::default(), "open menu", &cancel, move || async move {
            flaky(2, calls)
        })
        .await
        .unwrap();
        assert_eq!(out, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_error_carries_label_and_last_failure() {
        let calls = &AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let err = retry(RetryPolicy::fixed(3, Duration::from_secs(2)), "open menu", &cancel, move || async move {
            flaky(10, calls)
        })
        .await
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("open menu"));
        assert!(msg.contains("boom #3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_fixed_delay_between_attempts() {
        let calls = &AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();
        let _ = retry(RetryPolicy::fixed(2, Duration::from_secs(2)), "x", &cancel, move || async move {
            flaky(1, calls)
        })
        .await
        .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_failure_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let cancel = CancellationToken::new();
        let err = retry(RetryPolicy::default(), "x", &cancel, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AutomationError::Cancelled)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AutomationError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_delay() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });
        let err = retry(RetryPolicy::fixed(5, Duration::from_secs(60)), "x", &cancel, || async {
            Err::<(), _>(AutomationError::Driver("nope".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AutomationError::Cancelled));
    }

    #[test]
    fn exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(100),
                factor: 2.0,
                max: Duration::from_millis(500),
                jitter: Duration::ZERO,
            },
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(8), Duration::from_millis(500));

        let far = RetryPolicy::exponential(100, Duration::from_millis(100), Duration::from_secs(1));
        let d = far.delay_after(80);
        assert!(d >= Duration::from_secs(1) && d < Duration::from_millis(1050));
        let d = far.delay_after(u32::MAX);
        assert!(d >= Duration::from_secs(1) && d < Duration::from_millis(1050));

        let jittered = RetryPolicy::exponential(4, Duration::from_millis(200), Duration::from_secs(2));
        let d = jittered.delay_after(2);
        assert!(d >= Duration::from_millis(400) && d < Duration::from_millis(500));
    }
}
