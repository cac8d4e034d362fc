use std::io;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统 (可选,库本身只依赖tracing门面)
///
/// - JSON格式文件日志: 按天轮转,便于机器解析
/// - 控制台日志: 人类可读,便于开发调试
/// - 环境变量控制: RUST_LOG=debug 可调整日志级别
///
/// 敏感凭证 (skey/sid/pass_ticket) 不会出现在任何日志字段中。
pub fn init() -> Result<(), io::Error> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("wxbot")
        .filename_suffix("log")
        .build("logs")
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .json()
        .with_writer(file_appender)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}
