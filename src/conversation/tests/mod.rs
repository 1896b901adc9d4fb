//! Store behaviour tests for the conversation module.
