//! Выровненные host-буферы для обменов с устройством
//!
//! Рантайм Intel FPGA включает DMA только для буферов, выровненных на
//! 64 байта; невыровненный указатель молча уходит на медленный путь.
//! Обычный `Vec` такого выравнивания не гарантирует.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::slice;

/// Выравнивание, при котором передачи идут через DMA
pub const DMA_ALIGNMENT: usize = 64;

/// Непрерывный буфер элементов `T`, выровненный на [`DMA_ALIGNMENT`]
pub struct AlignedVec<T> {
    ptr: NonNull<T>,
    len: usize,
}

impl<T> AlignedVec<T> {
    fn layout(len: usize) -> Layout {
        Layout::array::<T>(len)
            .and_then(|l| l.align_to(DMA_ALIGNMENT))
            .expect("размер буфера не помещается в адресное пространство")
    }

    fn alloc_raw(len: usize) -> NonNull<T> {
        let layout = Self::layout(len);
        let raw = unsafe { alloc(layout) } as *mut T;
        match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    /// Число элементов
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Размер содержимого в байтах, как его ждут вызовы OpenCL
    pub fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }
}

impl<T: Copy + Default> AlignedVec<T> {
    /// Буфер из `len` элементов со значением по умолчанию
    pub fn zeroed(len: usize) -> Self {
        if len == 0 {
            return AlignedVec {
                ptr: NonNull::dangling(),
                len: 0,
            };
        }
        let ptr = Self::alloc_raw(len);
        for i in 0..len {
            unsafe { ptr.as_ptr().add(i).write(T::default()) };
        }
        AlignedVec { ptr, len }
    }
}

impl<T: Copy> AlignedVec<T> {
    /// Выровненная копия среза
    pub fn from_slice(data: &[T]) -> Self {
        if data.is_empty() {
            return AlignedVec {
                ptr: NonNull::dangling(),
                len: 0,
            };
        }
        let ptr = Self::alloc_raw(data.len());
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len());
        }
        AlignedVec {
            ptr,
            len: data.len(),
        }
    }
}

impl<T> Deref for AlignedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> DerefMut for AlignedVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        if self.len != 0 {
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, Self::layout(self.len)) };
        }
    }
}

// Буфер владеет своими данными так же, как Vec<T>
unsafe impl<T: Send> Send for AlignedVec<T> {}
unsafe impl<T: Sync> Sync for AlignedVec<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_is_aligned_and_zero() {
        let buf = AlignedVec::<i32>::zeroed(1000);
        assert_eq!(buf.as_ptr() as usize % DMA_ALIGNMENT, 0);
        assert_eq!(buf.len(), 1000);
        assert_eq!(buf.byte_len(), 4000);
        assert!(buf.iter().all(|&x| x == 0));
    }

    #[test]
    fn from_slice_copies_and_aligns() {
        let data: Vec<i32> = (0..257).collect();
        let buf = AlignedVec::from_slice(&data);
        assert_eq!(buf.as_ptr() as usize % DMA_ALIGNMENT, 0);
        assert_eq!(&buf[..], &data[..]);
    }

    #[test]
    fn mutation_through_slice() {
        let mut buf = AlignedVec::<i32>::zeroed(8);
        buf[3] = 42;
        buf[7] = -1;
        assert_eq!(buf[3], 42);
        assert_eq!(buf[7], -1);
        assert_eq!(buf.iter().filter(|&&x| x != 0).count(), 2);
    }

    #[test]
    fn empty_buffer_is_safe() {
        let buf = AlignedVec::<i32>::zeroed(0);
        assert!(buf.is_empty());
        assert_eq!(buf.byte_len(), 0);
        let copy = AlignedVec::<i32>::from_slice(&[]);
        assert_eq!(copy.len(), 0);
    }

    #[test]
    fn alignment_holds_for_odd_lengths() {
        for len in [1usize, 3, 7, 63, 65, 1999] {
            let buf = AlignedVec::<i32>::zeroed(len);
            assert_eq!(buf.as_ptr() as usize % DMA_ALIGNMENT, 0, "len={len}");
            assert_eq!(buf.len(), len);
        }
    }
}
