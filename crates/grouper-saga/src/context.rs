use indexmap::IndexMap;

/// Results of the steps that completed so far in one transaction run.
///
/// Entries are keyed by step id and kept in completion order. The map only
/// grows while the run moves forward; actions see it read-only.
#[derive(Debug)]
pub struct ExecutionContext<R> {
    previous_responses: IndexMap<String, R>,
}

impl<R> Default for ExecutionContext<R> {
    fn default() -> Self {
        Self {
            previous_responses: IndexMap::new(),
        }
    }
}

impl<R> ExecutionContext<R> {
    /// Create a context with no recorded responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Result recorded by the step with the given id, if it has completed.
    #[must_use]
    pub fn get(&self, step_id: &str) -> Option<&R> {
        self.previous_responses.get(step_id)
    }

    /// Whether `step_id` already produced a response.
    #[must_use]
    pub fn contains(&self, step_id: &str) -> bool {
        self.previous_responses.contains_key(step_id)
    }

    /// Every recorded response, in execution order.
    #[must_use]
    pub fn previous_responses(&self) -> &IndexMap<String, R> {
        &self.previous_responses
    }

    /// Number of steps that completed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.previous_responses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.previous_responses.is_empty()
    }

    /// Seed a context with a completed step, for exercising actions in isolation.
    #[cfg(any(test, feature = "testing"))]
    #[must_use]
    pub fn with_response(mut self, step_id: impl Into<String>, response: R) -> Self {
        self.record(step_id, response);
        self
    }

    pub(crate) fn record(&mut self, step_id: impl Into<String>, response: R) {
        self.previous_responses.insert(step_id.into(), response);
    }

    pub(crate) fn into_responses(self) -> IndexMap<String, R> {
        self.previous_responses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_empty() {
        let ctx: ExecutionContext<String> = ExecutionContext::new();

        assert!(ctx.is_empty());
        assert_eq!(ctx.len(), 0);
        assert!(ctx.get("insert").is_none());
    }

    #[test]
    fn recorded_responses_keep_completion_order() {
        let mut ctx = ExecutionContext::new();
        ctx.record("insert", "record".to_string());
        ctx.record("groupsCreate", "created".to_string());

        let ids: Vec<&str> = ctx.previous_responses().keys().map(String::as_str).collect();

        assert_eq!(ids, vec!["insert", "groupsCreate"]);
        assert!(ctx.contains("insert"));
        assert_eq!(ctx.get("groupsCreate").map(String::as_str), Some("created"));
    }

    #[test]
    fn with_response_seeds_context() {
        let ctx = ExecutionContext::new().with_response("setApproved", 3_u8);

        assert_eq!(ctx.get("setApproved"), Some(&3));
        assert_eq!(ctx.into_responses().len(), 1);
    }
}
