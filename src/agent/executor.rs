//! Agent conversation loop
//!
//! 1. Build the system message from role, goal and backstory
//! 2. Build the user message from the task and its context
//! 3. Call the model with the agent's capabilities as tools
//! 4. Run requested capabilities and feed their results back
//! 5. Repeat until the model answers in text or the iteration budget runs out

use super::Agent;
use crate::error::{CrewError, CrewResult};
use crate::llm::{CompletionRequest, CompletionResponse, Message, ToolCall};
use tracing::{debug, info};

/// Everything an agent needs to answer one task
#[derive(Debug, Clone, Copy)]
pub struct TaskPrompt<'a> {
    pub task_id: &'a str,
    /// Agent goal rendered with the run inputs
    pub goal: &'a str,
    pub description: &'a str,
    pub expected_output: &'a str,
    /// Outputs of the tasks this one depends on
    pub context: Option<&'a str>,
}

impl Agent {
    /// Answer a task, calling capabilities as the model requests them
    pub async fn perform(&self, prompt: &TaskPrompt<'_>) -> CrewResult<String> {
        let tools = self.capabilities.describe_all();
        let mut messages = self.build_initial_messages(prompt);
        let mut iteration = 0;

        loop {
            iteration += 1;
            self.check_iteration_limit(iteration, prompt.task_id)?;

            let request = self.create_completion_request(messages.clone(), &tools);
            debug!(
                task_id = %prompt.task_id,
                model = %request.model,
                messages = request.messages.len(),
                tools = tools.len(),
                "Sending LLM request"
            );

            let response = self.llm.complete(request).await.map_err(|e| {
                CrewError::execution(prompt.task_id, format!("LLM request failed: {e}"))
            })?;

            if let Some(content) = &response.content {
                messages.push(Message::assistant(content.clone()));
            }

            if let Some(tool_calls) = response.tool_calls.as_ref().filter(|_| response.wants_tools()) {
                debug!(
                    task_id = %prompt.task_id,
                    iteration,
                    tool_count = tool_calls.len(),
                    "Processing capability calls"
                );
                let results = self.execute_tool_calls(tool_calls).await;
                messages.push(Message::user(format!("Tool results:\n{}", results.join("\n"))));
                continue;
            }

            info!(
                task_id = %prompt.task_id,
                agent = %self.role,
                iterations = iteration,
                "Agent produced final answer"
            );
            return Self::extract_final_content(&response, prompt.task_id);
        }
    }

    fn build_initial_messages(&self, prompt: &TaskPrompt<'_>) -> Vec<Message> {
        let now = chrono::Utc::now();
        let mut system = format!("You are {}.", self.role);
        if !self.backstory.trim().is_empty() {
            system.push(' ');
            system.push_str(self.backstory.trim());
        }
        system.push_str(&format!("\nYour personal goal is: {}", prompt.goal));
        system.push_str(&format!(
            "\n\nCurrent date and time: {} UTC",
            now.format("%Y-%m-%d %H:%M:%S")
        ));

        let mut user = format!("Current Task: {}", prompt.description);
        if !prompt.expected_output.trim().is_empty() {
            user.push_str(&format!(
                "\n\nThis is the expected criteria for your final answer: {}",
                prompt.expected_output
            ));
        }
        if let Some(context) = prompt.context.filter(|c| !c.trim().is_empty()) {
            user.push_str(&format!(
                "\n\nThis is the context you're working with:\n{context}"
            ));
        }

        vec![Message::system(system), Message::user(user)]
    }

    fn create_completion_request(
        &self,
        messages: Vec<Message>,
        tools: &[crate::capabilities::CapabilityDescription],
    ) -> CompletionRequest {
        let mut request =
            CompletionRequest::new(self.settings.model.clone(), messages).with_tools(tools.to_vec());
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;
        request
    }

    async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<String> {
        let mut results = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            debug!(capability = %call.name, arguments = %call.arguments, "Executing capability");
            let text = match &call.argument_error {
                Some(reason) => self.capabilities.reject(&call.name, reason),
                None => self.capabilities.call(&call.name, &call.arguments).await,
            };
            results.push(format!("Tool {} returned: {}", call.name, text));
        }
        results
    }

    fn check_iteration_limit(&self, iteration: usize, task_id: &str) -> CrewResult<()> {
        if iteration > self.max_iterations {
            return Err(CrewError::execution(
                task_id,
                format!(
                    "capability loop exceeded maximum iterations ({})",
                    self.max_iterations
                ),
            ));
        }
        Ok(())
    }

    /// A turn with neither text nor capability calls is a failed task
    fn extract_final_content(response: &CompletionResponse, task_id: &str) -> CrewResult<String> {
        match response.content.as_deref() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(CrewError::execution(
                task_id,
                format!(
                    "model returned no answer (finish reason: {:?})",
                    response.finish_reason
                ),
            )),
        }
    }
}
