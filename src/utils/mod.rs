//! 공통 유틸리티 모듈
//!
//! # Modules
//!
//! - [`display_terminal`] - 부트스트랩 진행 상황 터미널 출력
//!
//! # Examples
//!
//! ```rust,ignore
//! use crate::utils::display_terminal::print_boxed_title;
//!
//! print_boxed_title("Service Container Ready");
//! ```

pub mod display_terminal;
