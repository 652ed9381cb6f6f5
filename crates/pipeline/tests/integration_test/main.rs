/// Integration tests for the pipeline: full descriptive and ML runs against a
/// local object store, failure handling, and the persisted artifacts.

mod descriptive;
mod failures;
mod helpers;
mod ml;
