//! 错误分类与数值结果码
use std::path::PathBuf;
use thiserror::Error;

/// 扫描完整结束
pub const RC_SUCCESS: i32 = 0;
/// 回调请求提前终止（非错误）
pub const RC_SCAN_TERMINATED: i32 = 1;
/// 调用参数非法（空模式集、id 冲突等）
pub const RC_INVALID_INPUT: i32 = 2;
/// 模式编译被引擎拒绝
pub const RC_COMPILE_ERROR: i32 = 3;
/// “无效文件”：grep 路径打不开、读不了或压缩数据损坏
pub const RC_INVALID_FILE: i32 = 4;
/// 宿主缺少引擎所需的指令集能力
pub const RC_CAPABILITY_ERROR: i32 = 5;

/// 扫描库的错误分类
/// - 所有失败均以显式 Result 返回给调用方，库内不做任何自动重试
///   （匹配是确定性的单趟过程，原样重试没有意义）。
#[derive(Debug, Error)]
pub enum ScanError {
    /// 调用参数非法
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 模式编译失败；message 为引擎报错原文，id 指向出错的那条模式
    #[error("pattern {id} failed to compile: {message}")]
    Compilation { id: u32, message: String },

    /// 文件无法作为扫描输入（对应 RC_INVALID_FILE）
    #[error("invalid file {}: {reason}", path.display())]
    InvalidFile { path: PathBuf, reason: String },

    /// 宿主能力不满足；进程内不可恢复，调用方不应继续编译或扫描
    #[error("capability mismatch: {0}")]
    CapabilityMismatch(String),
}

impl ScanError {
    /// 对应的数值结果码
    pub fn code(&self) -> i32 {
        match self {
            ScanError::InvalidInput(_) => RC_INVALID_INPUT,
            ScanError::Compilation { .. } => RC_COMPILE_ERROR,
            ScanError::InvalidFile { .. } => RC_INVALID_FILE,
            ScanError::CapabilityMismatch(_) => RC_CAPABILITY_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping() {
        assert_eq!(ScanError::InvalidInput("x".into()).code(), RC_INVALID_INPUT);
        let e = ScanError::Compilation { id: 7, message: "bad".into() };
        assert_eq!(e.code(), RC_COMPILE_ERROR);
        assert!(e.to_string().contains("pattern 7"));
        let e = ScanError::InvalidFile { path: "/no/such".into(), reason: "missing".into() };
        assert_eq!(e.code(), RC_INVALID_FILE);
        assert_eq!(ScanError::CapabilityMismatch("ssse3".into()).code(), RC_CAPABILITY_ERROR);
    }
}
