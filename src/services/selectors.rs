//! 门户元素标识表
//!
//! ⚠️ 运行风险：门户没有 API，也没有版本化的页面契约。下面每个标识都直接对应
//! 门户当前的页面标记，任何一处改版都会让对应步骤失败（通常表现为
//! `ElementNotFound` 被包装成登录/导航错误，或单条记录的 populate 失败）。
//! 出现批量失败时应先对照门户页面核对这里的标识。

/// "未选择" 的哨兵值
pub const NONE_SELECTED: &str = "-1";

/// 门户保存成功时状态标签中出现的原文
pub const SAVE_SUCCESS_PHRASE: &str = "Kayıt işlemi başarıyla tamamlandı";

/// 门户页面元素
#[derive(Debug, Clone)]
pub struct PortalSelectors {
    // --- 登录与机构选择 ---
    pub login_qr: String,
    pub school_select: String,
    pub school_activate: String,
    /// 进入录入页面需要依次点击的两个菜单项
    pub menu_entries: [String; 2],

    // --- 学生检索 ---
    pub student_search_input: String,
    pub student_search_submit: String,
    pub student_open: String,

    // --- 表单字段 ---
    pub service_area: String,
    pub primary_category: String,
    pub secondary_category: String,
    pub tertiary_category: String,
    pub meeting_date: String,
    pub start_time: String,
    pub end_time: String,
    pub workplace: String,
    pub session_count: String,

    // --- 保存 ---
    pub save: String,
    pub status_label: String,
    pub new_record: String,
    pub success_phrase: String,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            login_qr: "//a[contains(normalize-space(.), 'Karekod ile Giriş')]".to_string(),
            school_select: "#ddlKurumlar".to_string(),
            school_activate: "#btnKurumAktifEt".to_string(),
            menu_entries: [
                "//a[normalize-space(.)='Bireysel Çalışmalar']".to_string(),
                "//a[normalize-space(.)='Öğrenci Görüşmesi Ekle']".to_string(),
            ],
            student_search_input: "#txtOgrenciNo".to_string(),
            student_search_submit: "#btnOgrenciAra".to_string(),
            student_open: "(//input[@type='image' and @title='Aç'])[1]".to_string(),
            service_area: "#ddlHizmetAlani".to_string(),
            primary_category: "#ddlBirinciKategori".to_string(),
            secondary_category: "#ddlIkinciKategori".to_string(),
            tertiary_category: "#ddlUcuncuKategori".to_string(),
            meeting_date: "#txtGorusmeTarihi".to_string(),
            start_time: "#txtBaslangicSaati".to_string(),
            end_time: "#txtBitisSaati".to_string(),
            workplace: "#ddlCalismaYeri".to_string(),
            session_count: "#txtOturumSayisi".to_string(),
            save: "#btnKaydet".to_string(),
            status_label: "#lblDurum".to_string(),
            new_record: "#btnYeniKayit".to_string(),
            success_phrase: SAVE_SUCCESS_PHRASE.to_string(),
        }
    }
}
