//! 登录后落地页识别
//!
//! 扫码登录没有任何程序化的成功信号，只能通过跳转后的地址判断。

use std::sync::OnceLock;

use regex::Regex;

/// 已知的登录后落地页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// 主页，账号只有一个机构
    Home,
    /// 机构选择页，需要先选学校
    SchoolSelection,
}

fn patterns() -> &'static [(Regex, Landing)] {
    static PATTERNS: OnceLock<Vec<(Regex, Landing)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)/kurumsecim\.aspx(?:[?#]|$)", Landing::SchoolSelection),
            (r"(?i)/anasayfa\.aspx(?:[?#]|$)", Landing::Home),
            (r"(?i)/bireyselcalismalar/", Landing::Home),
        ]
        .into_iter()
        .map(|(p, landing)| (Regex::new(p).expect("landing pattern is valid"), landing))
        .collect()
    })
}

/// 按已知模式识别地址，未知地址返回 `None`
pub fn classify_landing(url: &str) -> Option<Landing> {
    patterns()
        .iter()
        .find(|(re, _)| re.is_match(url))
        .map(|(_, landing)| *landing)
}

/// 选校后的两跳导航地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalPaths {
    /// 中间落地页
    pub home_url: String,
    /// 数据录入菜单页
    pub data_entry_menu_url: String,
}

impl PortalPaths {
    pub fn from_entry(entry_url: &str) -> Self {
        let base = entry_url.trim_end_matches('/');
        Self {
            home_url: format!("{}/Anasayfa.aspx", base),
            data_entry_menu_url: format!("{}/BireyselCalismalar/Default.aspx", base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_known_landing_pages() {
        assert_eq!(
            classify_landing("https://e-rehberlik.meb.gov.tr/KurumSecim.aspx"),
            Some(Landing::SchoolSelection)
        );
        assert_eq!(
            classify_landing("https://e-rehberlik.meb.gov.tr/Anasayfa.aspx?ilk=1"),
            Some(Landing::Home)
        );
        assert_eq!(
            classify_landing("https://e-rehberlik.meb.gov.tr/BireyselCalismalar/Default.aspx"),
            Some(Landing::Home)
        );
    }

    #[test]
    fn unknown_pages_do_not_count_as_logged_in() {
        assert_eq!(classify_landing("https://giris.turkiye.gov.tr/Giris/Karekod"), None);
        assert_eq!(classify_landing("https://e-rehberlik.meb.gov.tr/"), None);
        assert_eq!(classify_landing("https://e-rehberlik.meb.gov.tr/AnasayfaEski.aspx"), None);
    }

    #[test]
    fn derives_two_hop_paths_from_entry() {
        let paths = PortalPaths::from_entry("https://e-rehberlik.meb.gov.tr/");
        assert_eq!(paths.home_url, "https://e-rehberlik.meb.gov.tr/Anasayfa.aspx");
        assert_eq!(
            paths.data_entry_menu_url,
            "https://e-rehberlik.meb.gov.tr/BireyselCalismalar/Default.aspx"
        );
    }
}
