//! 宿主能力检查（一次性、幂等）
use std::sync::OnceLock;

use crate::error::ScanError;

/// 进程生命周期内缓存的探测结果；None 表示宿主兼容
static PROBE: OnceLock<Option<String>> = OnceLock::new();

/// 校验宿主是否具备扫描引擎依赖的向量指令能力
/// - x86_64 要求 SSSE3（运行时探测）；aarch64 要求 NEON；其余架构走标量回退，直接通过。
/// - 结果对同一宿主是确定的，并在进程内缓存，可任意次重复调用。
/// - 失败返回 CapabilityMismatch，属不可恢复条件：调用方不应继续编译或扫描，
///   解决方式是换到满足指令集要求的硬件上运行。
///
/// `compile` 在首次编译前会隐式执行本检查，显式调用用于提前暴露问题。
pub fn check_compatibility() -> Result<(), ScanError> {
    match PROBE.get_or_init(probe_host) {
        None => Ok(()),
        Some(msg) => Err(ScanError::CapabilityMismatch(msg.clone())),
    }
}

#[cfg(target_arch = "x86_64")]
fn probe_host() -> Option<String> {
    if std::arch::is_x86_feature_detected!("ssse3") {
        None
    } else {
        Some("host CPU lacks SSSE3 support required by the scan engine".to_string())
    }
}

#[cfg(target_arch = "aarch64")]
fn probe_host() -> Option<String> {
    if std::arch::is_aarch64_feature_detected!("neon") {
        None
    } else {
        Some("host CPU lacks NEON support required by the scan engine".to_string())
    }
}

// 其余架构没有向量快路径，引擎按标量执行
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn probe_host() -> Option<String> {
    None
}
