//! 工具模块：时间戳获取与路径显示

pub mod path;
pub mod timestamp;

pub use self::path::display_relative;
pub use self::timestamp::GitTimestamp;
