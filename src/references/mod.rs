/*!
 * References Module
 * Reference wrappers handed back to callers
 */

mod reference;
mod referent;

pub use reference::Reference;
pub use referent::Referent;
