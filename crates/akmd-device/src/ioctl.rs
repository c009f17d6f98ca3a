//! Linux `_IOC` request encoding (asm-generic layout, shared by ARM and x86).

use std::io;
use std::mem::size_of;
use std::os::fd::AsRawFd;

const NR_SHIFT: u32 = 0;
const TYPE_SHIFT: u32 = 8;
const SIZE_SHIFT: u32 = 16;
const DIR_SHIFT: u32 = 30;
const SIZE_MASK: u32 = (1 << 14) - 1;

pub const DIR_NONE: u32 = 0;
pub const DIR_WRITE: u32 = 1;
pub const DIR_READ: u32 = 2;

pub const fn ioc(dir: u32, ty: u32, nr: u32, size: usize) -> u32 {
    (dir << DIR_SHIFT) | (((size as u32) & SIZE_MASK) << SIZE_SHIFT) | (ty << TYPE_SHIFT) | (nr << NR_SHIFT)
}

/// `_IO(ty, nr)`
pub const fn io(ty: u32, nr: u32) -> u32 {
    ioc(DIR_NONE, ty, nr, 0)
}

/// `_IOR(ty, nr, T)`
pub const fn ior<T>(ty: u32, nr: u32) -> u32 {
    ioc(DIR_READ, ty, nr, size_of::<T>())
}

/// `_IOW(ty, nr, T)`
pub const fn iow<T>(ty: u32, nr: u32) -> u32 {
    ioc(DIR_WRITE, ty, nr, size_of::<T>())
}

/// `_IOWR(ty, nr, T)`
pub const fn iowr<T>(ty: u32, nr: u32) -> u32 {
    ioc(DIR_READ | DIR_WRITE, ty, nr, size_of::<T>())
}

/// Size field of an encoded request.
pub const fn request_size(request: u32) -> usize {
    ((request >> SIZE_SHIFT) & SIZE_MASK) as usize
}

/// Issue `request` with `arg` as the kernel's in/out buffer.
///
/// The request must have been built with `T`, so the kernel never touches
/// more than `size_of::<T>()` bytes; anything else fails with `InvalidInput`.
pub(crate) fn ioctl_with<F: AsRawFd, T>(file: &F, request: u32, arg: &mut T) -> io::Result<i32> {
    if request_size(request) != size_of::<T>() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "ioctl {request:#x} encodes {} bytes, argument has {}",
                request_size(request),
                size_of::<T>()
            ),
        ));
    }
    // SAFETY: `arg` is an exclusively borrowed buffer whose size matches the
    // size encoded in `request`, and the fd stays open for the call.
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), request as _, arg as *mut T) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

/// Issue an argument-less request.
pub(crate) fn ioctl_none<F: AsRawFd>(file: &F, request: u32) -> io::Result<i32> {
    // SAFETY: `_IO` requests carry no argument.
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), request as _) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}
