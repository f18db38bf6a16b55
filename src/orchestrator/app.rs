//! 应用生命周期 - 编排层
//!
//! 1. **初始化**：输出启动信息、检查配置、创建补全客户端和改写流程
//! 2. **运行**：绑定监听地址，提供 HTTP 服务
//! 3. **停止**：收到 Ctrl-C 后取消根令牌，正在进行的请求随之取消，服务优雅退出

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{router, ApiState};
use crate::clients::{CompletionProvider, LlmClient, ModelParams};
use crate::config::Config;
use crate::error::{AppResult, ServerError};
use crate::utils::logging::{log_shutdown, log_startup};
use crate::workflow::RewriteFlow;

/// 应用主结构
pub struct App {
    config: Config,
    router: Router,
    shutdown: CancellationToken,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);
        config.validate()?;

        let client = LlmClient::new(&config)?;
        Ok(Self::with_provider(config, Arc::new(client)))
    }

    /// 使用指定的补全服务组装应用
    pub fn with_provider(config: Config, provider: Arc<dyn CompletionProvider>) -> Self {
        let flow = RewriteFlow::new(
            provider,
            ModelParams::from_config(&config),
            config.retry_policy(),
        );
        let shutdown = CancellationToken::new();
        let router = router(ApiState {
            flow: Arc::new(flow),
            shutdown: shutdown.clone(),
        });

        Self {
            config,
            router,
            shutdown,
        }
    }

    /// 根取消令牌，取消后服务停止
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 绑定配置中的地址并运行，直到收到 Ctrl-C
    pub async fn run(self) -> AppResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr)
            .await
            .map_err(|source| ServerError::BindFailed {
                addr: self.config.bind_addr.clone(),
                source,
            })?;

        let token = self.shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("🛑 收到停止信号，正在关闭服务..."),
                Err(e) => warn!("无法监听停止信号: {}", e),
            }
            token.cancel();
        });

        self.serve(listener).await
    }

    /// 在已绑定的监听器上提供服务，直到根令牌被取消
    pub async fn serve(self, listener: TcpListener) -> AppResult<()> {
        match listener.local_addr() {
            Ok(addr) => info!("✅ 服务已就绪: http://{}", addr),
            Err(_) => info!("✅ 服务已就绪: {}", self.config.bind_addr),
        }

        let token = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(|source| ServerError::ServeFailed { source })?;

        log_shutdown();
        Ok(())
    }
}
