use anyhow::{Context, Result};
use rehberlik_transfer::utils::logging;
use rehberlik_transfer::{App, Config};
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env().context("配置无效")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let app = App::new(config);

    // Ctrl-C 中止当前批次，会话仍会正常关闭
    let cancel = app.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到中断信号，正在中止本批...");
            cancel.cancel();
        }
    });

    app.run().await?;

    Ok(())
}
