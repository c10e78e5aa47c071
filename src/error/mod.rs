/*!
 Errors that can happen when decoding data.
*/

pub mod nrbf;
