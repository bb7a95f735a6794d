use std::path::Path;

use rehberlik_transfer::models::load_records;
use rehberlik_transfer::utils::logging;
use rehberlik_transfer::{run_batch, AutomationSession, ChromeDriver, Config, SessionSettings};
use tokio_util::sync::CancellationToken;

#[tokio::test]
#[ignore] // 默认忽略，需要真实浏览器和人工扫码：cargo test -- --ignored
async fn test_transfer_sample_records() {
    // 加载配置
    let config = Config::from_env().expect("配置无效");
    logging::init(true);

    // 注意：请根据实际情况修改记录文件路径
    let records = load_records(Path::new("demos/records.example.toml"))
        .await
        .expect("加载记录文件失败");

    let mut session = AutomationSession::new(
        ChromeDriver::from_config(&config),
        SessionSettings::from_config(&config),
        CancellationToken::new(),
    );
    let report = run_batch(&mut session, &records).await;
    session.close().await;

    assert!(report.fatal.is_none(), "批处理不应中止: {:?}", report.fatal);
    assert_eq!(report.entries.len(), records.len());
}

#[tokio::test]
#[ignore]
async fn test_browser_launch() {
    let config = Config::from_env().expect("配置无效");
    logging::init(true);

    let mut session = AutomationSession::new(
        ChromeDriver::from_config(&config),
        SessionSettings::from_config(&config),
        CancellationToken::new(),
    );

    assert!(session.initialize().await.is_ok(), "应该能够启动浏览器并打开门户");
    session.close().await;
}
