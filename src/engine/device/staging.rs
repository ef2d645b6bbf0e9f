//! ### English
//! Pitched staging buffer that decouples the texture copy from the encode step.
//!
//! ### 中文
//! 带 pitch 的暂存缓冲：把纹理拷贝与编码步骤解耦。

/// ### English
/// Row pitch alignment in bytes.
///
/// ### 中文
/// 行 pitch 的对齐字节数。
pub const STAGING_PITCH_ALIGN: usize = 256;

/// ### English
/// Intermediate buffer holding one copied texture (`rows` rows of `pitch` bytes).
///
/// ### 中文
/// 保存一份纹理拷贝的中间缓冲（`rows` 行，每行 `pitch` 字节）。
pub struct StagingBuffer {
    data: Box<[u8]>,
    pitch: usize,
    rows: usize,
}

impl StagingBuffer {
    /// ### English
    /// Allocates a zeroed buffer for `rows` rows of at least `row_bytes` bytes each.
    ///
    /// ### 中文
    /// 为 `rows` 行、每行至少 `row_bytes` 字节分配一块清零缓冲。
    pub fn new(row_bytes: usize, rows: usize) -> Self {
        let pitch = row_bytes.max(1).next_multiple_of(STAGING_PITCH_ALIGN);
        Self {
            data: vec![0u8; pitch * rows].into_boxed_slice(),
            pitch,
            rows,
        }
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// ### English
    /// Mutable view of row `y` (full pitch).
    ///
    /// ### 中文
    /// 第 `y` 行的可变视图（完整 pitch）。
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.pitch;
        &mut self.data[start..start + self.pitch]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_is_aligned_and_covers_row() {
        let staging = StagingBuffer::new(4 * 300, 2);
        assert_eq!(staging.pitch(), 1280);
        assert_eq!(staging.rows(), 2);
        assert_eq!(staging.as_slice().len(), 2560);
    }

    #[test]
    fn rows_do_not_overlap() {
        let mut staging = StagingBuffer::new(4, 2);
        staging.row_mut(1).fill(7);
        assert!(staging.as_slice()[..STAGING_PITCH_ALIGN].iter().all(|b| *b == 0));
        assert!(staging.as_slice()[STAGING_PITCH_ALIGN..].iter().all(|b| *b == 7));
    }
}
