use anyhow::Result;
use pairwrit_backend::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 读取 .env（如果存在）
    dotenv::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
