pub mod catalog;
pub mod error;
pub mod extract;
pub mod floodfill;
pub mod indexed;
pub mod output;
pub mod pak;
pub mod pakfile;
pub mod palette;
pub mod pcx;
pub mod raw;
pub mod read;
pub mod wal;
