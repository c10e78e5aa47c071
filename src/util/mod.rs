/*!
 This module defines the decoders and their shared utilities.
*/

pub mod dates;
pub mod nrbf;
