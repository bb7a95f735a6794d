//! 学校选择服务 - 业务能力层
//!
//! 登录账号能访问多个机构时，从门户下拉框中选出正确的学校。

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{AutomationError, Result};
use crate::infrastructure::PortalPage;
use crate::models::{InstitutionIdentity, SchoolOption};
use crate::services::selectors::{PortalSelectors, NONE_SELECTED};

const OPTIONS_TIMEOUT: Duration = Duration::from_secs(10);
const ACTIVATE_TIMEOUT: Duration = Duration::from_secs(5);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// 命中的匹配层级，数字越小优先级越高
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    ExactCode = 1,
    ExactName = 2,
    PartialName = 3,
    FirstSchool = 4,
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchTier::ExactCode => "代码精确匹配",
            MatchTier::ExactName => "名称精确匹配",
            MatchTier::PartialName => "名称部分匹配",
            MatchTier::FirstSchool => "第一个学校选项",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub option: SchoolOption,
    pub tier: MatchTier,
}

/// 按优先级选择学校
///
/// 1. 代码精确匹配（哨兵值除外）
/// 2. 名称忽略大小写精确匹配
/// 3. 名称忽略大小写互相包含
/// 4. 第一个既不是哨兵也不是行政单位的选项（`allow_fallback` 为 false 时跳过）
pub fn resolve_school(
    options: &[SchoolOption],
    identity: &InstitutionIdentity,
    allow_fallback: bool,
) -> Result<Resolution> {
    let candidates: Vec<&SchoolOption> = options.iter().filter(|o| !is_sentinel(o)).collect();
    let hit = |option: &SchoolOption, tier| Resolution {
        option: option.clone(),
        tier,
    };

    if let Some(code) = identity.code.as_deref() {
        if let Some(o) = candidates.iter().find(|o| o.code.trim() == code) {
            return Ok(hit(*o, MatchTier::ExactCode));
        }
    }

    if let Some(name) = identity.name.as_deref() {
        let wanted = fold(name);
        if !wanted.is_empty() {
            if let Some(o) = candidates.iter().find(|o| fold(&o.label) == wanted) {
                return Ok(hit(*o, MatchTier::ExactName));
            }
            if let Some(o) = candidates.iter().find(|o| {
                let label = fold(&o.label);
                !label.is_empty() && (label.contains(&wanted) || wanted.contains(&label))
            }) {
                return Ok(hit(*o, MatchTier::PartialName));
            }
        }
    }

    if allow_fallback {
        if let Some(o) = candidates.iter().find(|o| !is_office_label(&o.label)) {
            return Ok(hit(*o, MatchTier::FirstSchool));
        }
    }

    Err(AutomationError::SchoolSelection(format!(
        "{} 个选项中没有匹配 (代码: {:?}, 名称: {:?})",
        options.len(),
        identity.code,
        identity.name
    )))
}

fn is_sentinel(option: &SchoolOption) -> bool {
    let code = option.code.trim();
    code.is_empty() || code == NONE_SELECTED
}

/// 行政单位（教育局、科室）而非学校的选项
pub fn is_office_label(label: &str) -> bool {
    static OFFICE: OnceLock<Regex> = OnceLock::new();
    let re = OFFICE.get_or_init(|| {
        Regex::new(r"mudurlugu|milli egitim|\bmem\b|\bsube\b")
            .expect("office pattern is valid")
    });
    re.is_match(&fold(label))
}

/// 忽略大小写比较用的规范化：土耳其字母折叠为 ASCII（İ/I/ı → i，ş → s …），合并空白
///
/// 操作员常用 ASCII 键盘输入机构名称。
pub fn fold(text: &str) -> String {
    let lowered: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| *c != '\u{307}')
        .map(|c| match c {
            'ı' | 'î' => 'i',
            'ç' => 'c',
            'ğ' => 'g',
            'ö' => 'o',
            'ş' => 's',
            'ü' | 'û' => 'u',
            'â' => 'a',
            other => other,
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 在门户页面上完成学校选择
pub struct SchoolResolver {
    selectors: PortalSelectors,
    allow_fallback: bool,
}

impl SchoolResolver {
    pub fn new(selectors: PortalSelectors, allow_fallback: bool) -> Self {
        Self {
            selectors,
            allow_fallback,
        }
    }

    /// 读取选项 → 匹配 → 选中 → 激活 → 等待页面跳转
    pub async fn select<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        identity: &InstitutionIdentity,
    ) -> Result<Resolution> {
        let options = page
            .options(&self.selectors.school_select, OPTIONS_TIMEOUT)
            .await
            .map_err(|e| wrap("读取学校列表", e))?;
        debug!("学校选项: {:?}", options);

        let resolution = resolve_school(&options, identity, self.allow_fallback)?;
        if resolution.tier == MatchTier::FirstSchool {
            warn!(
                "⚠️ 代码和名称都未能匹配，退回第一个学校选项: {} ({})",
                resolution.option.label, resolution.option.code
            );
        } else {
            info!(
                "🏫 选择学校: {} ({}) [{}]",
                resolution.option.label, resolution.option.code, resolution.tier
            );
        }

        page.select_option(&self.selectors.school_select, &resolution.option.code, OPTIONS_TIMEOUT)
            .await
            .map_err(|e| wrap("选中学校", e))?;
        page.click(&self.selectors.school_activate, ACTIVATE_TIMEOUT)
            .await
            .map_err(|e| wrap("点击激活按钮", e))?;
        page.wait_for_navigation(NAVIGATION_TIMEOUT)
            .await
            .map_err(|e| wrap("等待机构切换", e))?;

        Ok(resolution)
    }
}

fn wrap(step: &str, err: AutomationError) -> AutomationError {
    if err.is_infrastructure() {
        return err;
    }
    AutomationError::SchoolSelection(format!("{}: {}", step, err))
}
