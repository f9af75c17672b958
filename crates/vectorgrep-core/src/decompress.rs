//! 压缩输入识别与解压（gzip / zstd）
use std::io::{self, Read};

use flate2::read::MultiGzDecoder;

/// gzip 魔数（RFC 1952）
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// zstd 魔数（RFC 8878）
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// 按魔数识别压缩格式；命中则整体解压到内存，否则原样返回
/// - MultiGzDecoder 将拼接的多个 gzip 成员视为同一条流
/// - 解压失败（数据损坏/截断）向上传播 io::Error，由调用方映射为“无效文件”
pub(crate) fn maybe_decompress(buf: Vec<u8>) -> io::Result<Vec<u8>> {
    if buf.len() >= GZIP_MAGIC.len() && buf[..2] == GZIP_MAGIC {
        let mut out = Vec::new();
        MultiGzDecoder::new(&buf[..]).read_to_end(&mut out)?;
        return Ok(out);
    }
    if buf.len() >= ZSTD_MAGIC.len() && buf[..4] == ZSTD_MAGIC {
        return zstd::stream::decode_all(&buf[..]);
    }
    Ok(buf)
}
