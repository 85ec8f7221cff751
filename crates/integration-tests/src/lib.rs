//! End-to-end tests for the LLM bridge client against a mock bridge server
