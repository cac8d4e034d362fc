//! 工具模块
//!
//! - logger: 结构化日志初始化 (控制台 + 按天轮转的JSON文件)
//! - time_utils: 协议所需的时间戳/标识辅助函数

pub mod logger;
pub mod time_utils;
