/*!
 * Command implementations
 */

pub mod exec;
pub mod feed;
pub mod render;
pub mod show;
