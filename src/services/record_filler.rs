//! 记录录入服务 - 业务能力层
//!
//! 只处理单条 SessionRecord：检索学生 → 填写表单 → 保存并校验 → 重置表单。
//! 单条记录的失败被吸收为 `RecordResult`，只有取消和连接断开会向上返回。

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AutomationError, RecordError, Result};
use crate::infrastructure::PortalPage;
use crate::models::{RecordResult, SessionRecord};
use crate::services::selectors::PortalSelectors;
use crate::utils::retry::{retry, sleep_or_cancel, RetryPolicy};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);
const TERTIARY_PROBE: Duration = Duration::from_secs(2);
const RESET_TIMEOUT: Duration = Duration::from_secs(2);
const SAVE_SETTLE: Duration = Duration::from_millis(1500);

fn search_policy() -> RetryPolicy {
    RetryPolicy::fixed(2, Duration::from_secs(2))
}

fn dropdown_policy() -> RetryPolicy {
    RetryPolicy::fixed(2, Duration::from_secs(1))
}

/// 流水线内部的失败分类
enum StepError {
    /// 只影响当前记录
    Record(RecordError),
    /// 中止整批
    Fatal(AutomationError),
}

type StepResult<T = ()> = std::result::Result<T, StepError>;

/// 基础设施错误保持致命，其余转换为记录级错误
fn classify(err: AutomationError, to_record: impl FnOnce(AutomationError) -> RecordError) -> StepError {
    if err.is_infrastructure() {
        StepError::Fatal(err)
    } else {
        StepError::Record(to_record(err))
    }
}

fn populate_err(field: &'static str) -> impl FnOnce(AutomationError) -> RecordError {
    move |err| RecordError::Populate {
        field,
        detail: err.to_string(),
    }
}

/// 记录录入流程
pub struct RecordFiller {
    selectors: PortalSelectors,
}

impl RecordFiller {
    pub fn new(selectors: PortalSelectors) -> Self {
        Self { selectors }
    }

    /// 录入一条记录
    ///
    /// `Ok` 表示流水线走完（结果可能是失败），`Err` 只在需要中止整批时返回。
    pub async fn fill<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        record: &SessionRecord,
        cancel: &CancellationToken,
    ) -> Result<RecordResult> {
        if let Err(err) = record.validate() {
            warn!("[学生 {}] ⚠️ 记录未通过本地校验: {}", record.student_no, err);
            return Ok(RecordResult::failed(err));
        }

        let outcome = async {
            self.search_and_open(page, record, cancel).await?;
            self.populate(page, record, cancel).await?;
            self.submit(page, record, cancel).await
        }
        .await;

        match outcome {
            Ok(()) => {
                info!("[学生 {}] ✓ 记录保存成功", record.student_no);
                Ok(RecordResult::ok())
            }
            Err(StepError::Record(err)) => {
                warn!("[学生 {}] ⚠️ 记录失败: {}", record.student_no, err);
                self.reset_form(page).await;
                Ok(RecordResult::failed(err))
            }
            Err(StepError::Fatal(err)) => Err(err),
        }
    }

    async fn search_and_open<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        record: &SessionRecord,
        cancel: &CancellationToken,
    ) -> StepResult {
        debug!("[学生 {}] 🔍 检索学生", record.student_no);
        let s = &self.selectors;
        let student_no = record.student_no.trim();
        let label = format!("检索学生 {}", student_no);

        retry(search_policy(), &label, cancel, move || async move {
            page.fill(&s.student_search_input, student_no, STEP_TIMEOUT).await?;
            page.click(&s.student_search_submit, STEP_TIMEOUT).await?;
            page.click(&s.student_open, STEP_TIMEOUT).await
        })
        .await
        .map_err(|e| classify(e, |_| RecordError::StudentNotFound))
    }

    async fn populate<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        record: &SessionRecord,
        cancel: &CancellationToken,
    ) -> StepResult {
        debug!("[学生 {}] 📝 填写表单", record.student_no);
        let s = &self.selectors;

        self.select_retried(page, "service area", &s.service_area, &record.service_area, cancel)
            .await?;
        self.select_retried(page, "primary category", &s.primary_category, &record.primary_category, cancel)
            .await?;
        self.select_retried(
            page,
            "secondary category",
            &s.secondary_category,
            &record.secondary_category,
            cancel,
        )
        .await?;

        if let Some(tertiary) = record.tertiary_category.as_deref() {
            match page.wait_for(&s.tertiary_category, TERTIARY_PROBE).await {
                Ok(()) => {
                    self.select_retried(page, "tertiary category", &s.tertiary_category, tertiary, cancel)
                        .await?
                }
                Err(AutomationError::ElementNotFound { .. }) => {
                    debug!("[学生 {}] 门户未提供三级类别，跳过", record.student_no);
                }
                Err(e) => return Err(classify(e, populate_err("tertiary category"))),
            }
        }

        page.set_value(&s.meeting_date, &record.portal_date(), STEP_TIMEOUT)
            .await
            .map_err(|e| classify(e, populate_err("meeting date")))?;
        page.set_value(&s.start_time, &record.portal_start_time(), STEP_TIMEOUT)
            .await
            .map_err(|e| classify(e, populate_err("start time")))?;
        page.set_value(&s.end_time, &record.portal_end_time(), STEP_TIMEOUT)
            .await
            .map_err(|e| classify(e, populate_err("end time")))?;

        page.select_option(&s.workplace, &record.workplace, STEP_TIMEOUT)
            .await
            .map_err(|e| classify(e, populate_err("workplace")))?;
        page.fill(&s.session_count, &record.session_count.to_string(), STEP_TIMEOUT)
            .await
            .map_err(|e| classify(e, populate_err("session count")))?;

        Ok(())
    }

    /// 门户下拉框经常需要等联动刷新后才可操作，每个单独重试
    async fn select_retried<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        field: &'static str,
        expr: &str,
        value: &str,
        cancel: &CancellationToken,
    ) -> StepResult {
        let label = format!("选择 {} = {}", field, value);
        retry(dropdown_policy(), &label, cancel, move || async move {
            page.select_option(expr, value, STEP_TIMEOUT).await
        })
        .await
        .map_err(|e| classify(e, populate_err(field)))
    }

    async fn submit<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        record: &SessionRecord,
        cancel: &CancellationToken,
    ) -> StepResult {
        let s = &self.selectors;

        // 上一条记录的成功提示还在时无法判断本次是否真的保存
        let before = self.status_text(page, record).await?;
        if before.contains(&s.success_phrase) {
            return Err(StepError::Record(RecordError::StaleStatus));
        }

        debug!("[学生 {}] 💾 保存记录", record.student_no);
        page.click(&s.save, STEP_TIMEOUT)
            .await
            .map_err(|e| classify(e, populate_err("save")))?;
        sleep_or_cancel(SAVE_SETTLE, cancel)
            .await
            .map_err(StepError::Fatal)?;

        let status = self.status_text(page, record).await?;
        if !status.contains(&s.success_phrase) {
            return Err(StepError::Record(RecordError::SaveRejected(status)));
        }

        if let Err(e) = page.click(&s.new_record, STEP_TIMEOUT).await {
            if e.is_infrastructure() {
                return Err(StepError::Fatal(e));
            }
            // 记录已保存；提示未清除时下一条记录会在保存前被拦下
            warn!("[学生 {}] ⚠️ 点击新记录按钮失败: {}", record.student_no, e);
        }
        Ok(())
    }

    async fn status_text<P: PortalPage + ?Sized>(&self, page: &P, record: &SessionRecord) -> StepResult<String> {
        match page.text(&self.selectors.status_label, STEP_TIMEOUT).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_infrastructure() => Err(StepError::Fatal(e)),
            Err(e) => {
                warn!("[学生 {}] 无法读取状态标签: {}", record.student_no, e);
                Ok(String::new())
            }
        }
    }

    /// 失败后尽量把表单恢复到空白状态；按钮不在页面上时跳过
    async fn reset_form<P: PortalPage + ?Sized>(&self, page: &P) {
        let new_record = &self.selectors.new_record;
        match page.is_present(new_record).await {
            Ok(true) => {
                if let Err(e) = page.click(new_record, RESET_TIMEOUT).await {
                    debug!("重置表单失败（忽略）: {}", e);
                }
            }
            Ok(false) => debug!("页面上没有新记录按钮，跳过重置"),
            Err(e) => debug!("检查新记录按钮失败（忽略）: {}", e),
        }
    }
}
