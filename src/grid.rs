use glam::IVec2;

/// A dense `cols x rows` array stored row by row: `index = col + row * cols`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    cols: usize,
    rows: usize,
    data: Vec<T>,
}

impl<T: Copy> Field<T> {
    pub fn filled(cols: usize, rows: usize, value: T) -> Self {
        Self {
            cols,
            rows,
            data: vec![value; cols * rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index of `(col, row)`, or `None` when it lies outside the field.
    #[inline(always)]
    pub fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return None;
        }
        Some(col as usize + row as usize * self.cols)
    }

    /// Inverse of [`Field::index`].
    #[inline(always)]
    pub fn coords(&self, index: usize) -> IVec2 {
        IVec2::new((index % self.cols) as i32, (index / self.cols) as i32)
    }

    #[inline(always)]
    pub fn get(&self, col: i32, row: i32) -> Option<T> {
        self.index(col, row).map(|idx| self.data[idx])
    }

    /// Writes `value` and reports whether `(col, row)` was inside the field.
    pub fn set(&mut self, col: i32, row: i32, value: T) -> bool {
        match self.index(col, row) {
            Some(idx) => {
                self.data[idx] = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

/// A primary field plus a scratch twin of the same shape. Sweeps read `current` and write
/// `scratch`; [`DoubleBuffer::swap`] then hands the scratch storage over as the new current
/// state without copying any cell.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    current: Field<T>,
    scratch: Field<T>,
}

impl<T: Copy> DoubleBuffer<T> {
    pub fn filled(cols: usize, rows: usize, value: T) -> Self {
        Self {
            current: Field::filled(cols, rows, value),
            scratch: Field::filled(cols, rows, value),
        }
    }

    pub fn current(&self) -> &Field<T> {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Field<T> {
        &mut self.current
    }

    /// Borrow the frozen state and the write target at the same time.
    pub fn split(&mut self) -> (&Field<T>, &mut Field<T>) {
        (&self.current, &mut self.scratch)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.scratch);
    }

    pub fn fill(&mut self, value: T) {
        self.current.fill(value);
        self.scratch.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_row_major() {
        let field = Field::filled(4, 3, 0.0f32);
        assert_eq!(field.index(0, 0), Some(0));
        assert_eq!(field.index(3, 0), Some(3));
        assert_eq!(field.index(1, 2), Some(9));
        assert_eq!(field.coords(9), IVec2::new(1, 2));
    }

    #[test]
    fn test_out_of_range_access() {
        let mut field = Field::filled(2, 2, 1.0f32);
        assert_eq!(field.get(-1, 0), None);
        assert_eq!(field.get(0, 2), None);
        assert_eq!(field.get(2, 1), None);
        assert!(!field.set(5, 5, 3.0));
        assert!(field.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_swap_exchanges_storage_without_copy() {
        let mut buffer = DoubleBuffer::filled(3, 3, 0.0f32);
        let scratch_ptr = {
            let (_, scratch) = buffer.split();
            scratch.set(1, 1, 7.0);
            scratch.as_slice().as_ptr()
        };
        assert_eq!(buffer.current().get(1, 1), Some(0.0));

        buffer.swap();

        assert_eq!(buffer.current().get(1, 1), Some(7.0));
        assert_eq!(buffer.current().as_slice().as_ptr(), scratch_ptr);
    }
}
