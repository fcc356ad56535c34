pub mod memory;
pub mod traits;
#[cfg(unix)]
pub mod unix;

pub use memory::{MemoryFile, MemoryVfs};
pub use traits::{OpenFlags, Vfs, VfsFile};
#[cfg(unix)]
pub use unix::{UnixFile, UnixVfs};
