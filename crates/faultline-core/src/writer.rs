//! # Report Writer
//!
//! Write-only visitor contract between a completed [`EventContext`] and the
//! downstream serialization component.
//!
//! The core does not decide report content or format; that belongs to the
//! serializer. This trait is the seam between them: each monitor domain can
//! emit arbitrarily structured data (nested objects, arrays, binary blobs,
//! whole files) without the core or the serializer knowing monitor-specific
//! shapes. Implementations are expected to stream: elements are written in
//! call order, containers nest via `begin_object`/`begin_array` and close
//! with `end_container`.
//!
//! [`EventContext`]: crate::context::EventContext

use std::path::Path;

/// Streaming visitor over the elements of a crash report.
///
/// All `name` parameters are the key under which the element lands in the
/// enclosing container; names inside an array container are ignored by
/// implementations that map to JSON arrays.
pub trait ReportWriter
{
    /// Add a boolean element.
    fn add_boolean_element(&mut self, name: &str, value: bool);

    /// Add a signed integer element.
    fn add_integer_element(&mut self, name: &str, value: i64);

    /// Add an unsigned integer element.
    fn add_unsigned_integer_element(&mut self, name: &str, value: u64);

    /// Add a floating point element.
    fn add_floating_point_element(&mut self, name: &str, value: f64);

    /// Add a string element.
    fn add_string_element(&mut self, name: &str, value: &str);

    /// Add a string element whose value is the contents of a text file.
    fn add_text_file_element(&mut self, name: &str, file_path: &Path);

    /// Add an array of string elements, one per line of a text file.
    fn add_text_file_lines_element(&mut self, name: &str, file_path: &Path);

    /// Add a pre-formatted JSON fragment read from a file.
    ///
    /// When `close_last_container` is false, the fragment's last container is
    /// left open so the caller can append further elements to it.
    fn add_json_file_element(&mut self, name: &str, file_path: &Path, close_last_container: bool);

    /// Add a pre-formatted JSON fragment.
    ///
    /// Same `close_last_container` semantics as [`add_json_file_element`].
    ///
    /// [`add_json_file_element`]: ReportWriter::add_json_file_element
    fn add_json_element(&mut self, name: &str, json: &str, close_last_container: bool);

    /// Add binary data by value.
    fn add_data_element(&mut self, name: &str, value: &[u8]);

    /// Begin an incrementally written binary data element.
    fn begin_data_element(&mut self, name: &str);

    /// Append bytes to the data element opened by [`begin_data_element`].
    ///
    /// [`begin_data_element`]: ReportWriter::begin_data_element
    fn append_data_element(&mut self, value: &[u8]);

    /// Complete the data element opened by [`begin_data_element`].
    ///
    /// [`begin_data_element`]: ReportWriter::begin_data_element
    fn end_data_element(&mut self);

    /// Add a raw 16-byte UUID element.
    fn add_uuid_element(&mut self, name: &str, value: &[u8; 16]);

    /// Begin a new object container.
    fn begin_object(&mut self, name: &str);

    /// Begin a new array container.
    fn begin_array(&mut self, name: &str);

    /// Leave the current container, returning to the enclosing one.
    fn end_container(&mut self);
}
