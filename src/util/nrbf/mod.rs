/*!
 Contains logic and data structures used to decode binary-serialized object graphs into native Rust data structures.

 ## Overview

 The format is a binary serialization protocol for graphs of objects, primarily produced by the .NET
 `BinaryFormatter`. A stream is a sequence of self-describing records, each introduced by a one-byte tag:
 class definitions with their member layouts, instances that reuse an earlier layout, strings, arrays,
 nulls, and references to objects by id.

 ## Features

 - Pure Rust implementation for efficient and safe deserialization
 - Object ids and class layouts are tracked per stream, so any number of streams can be decoded independently
 - Robust error handling for malformed or truncated data, reporting the offset of the first failure
 - Extensible layouts for system types that are stored without type descriptions

 ## Example

 ```rust
 use nrbf_database::util::nrbf::parser::decode;

 // A lone string record with id 1
 let stream = [0x06, 0x01, 0x00, 0x00, 0x00, 0x02, b'h', b'i'];
 let decoded = decode(&stream).unwrap();

 assert_eq!(decoded.records[0].as_str(), Some("hi"));
 ```
*/

mod arrays;
mod descriptors;
pub mod layouts;
pub mod models;
pub mod objects;
pub mod options;
pub mod parser;
pub mod stream;
mod tests;
