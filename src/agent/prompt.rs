//! Reasoning prompt and output parsing
//!
//! The agent follows a zero-shot "Thought / Action / Action Input /
//! Observation" loop. This module renders the prompt for one iteration and
//! parses what the model wrote back.

use crate::agent::tools::SqlTool;
use crate::database::Dialect;
use crate::llm::PromptMessage;

/// Generation stops here so the model never invents tool output
pub const OBSERVATION_STOP: &str = "\nObservation:";

const FINAL_ANSWER_MARKER: &str = "Final Answer:";
const ACTION_MARKER: &str = "Action:";
const ACTION_INPUT_MARKER: &str = "Action Input:";

/// One completed reasoning step, replayed to the model on the next iteration
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchpadEntry {
    /// Raw model output for the step
    pub model_output: String,
    /// What the tool (or the parser) said back
    pub observation: String,
}

/// What the model decided to do
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    /// Call a tool
    Action {
        /// Reasoning preceding the action
        thought: String,
        /// Tool name as written by the model
        tool: String,
        /// Tool input
        input: String,
    },
    /// Stop with an answer
    Finish {
        /// Reasoning preceding the answer
        thought: String,
        /// The answer
        answer: String,
    },
}

/// Model output that follows neither the action nor the answer format
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Message fed back to the model as the observation
    pub feedback: String,
}

/// Build the instructions for a question
pub fn system_prompt(dialect: Dialect, top_k: usize, tools: &[SqlTool]) -> String {
    let tool_lines: Vec<String> = tools
        .iter()
        .map(|t| format!("{}: {}", t.name(), t.description()))
        .collect();
    let tool_names: Vec<&str> = tools.iter().map(|t| t.name()).collect();

    format!(
        "You are an agent that answers business questions by querying a SQL database.\n\
         Given a question, write a syntactically correct {dialect} query, run it, look at the \
         results and answer the question.\n\
         Unless the user asks for a specific number of examples, limit every query to at most \
         {top_k} rows. Order results by a relevant column to surface the most useful rows.\n\
         Select only the columns relevant to the question, never every column of a table.\n\
         Use only the tools listed below and only the information they return.\n\
         Check each query before running it. If a query fails, rewrite it and try again.\n\
         Never issue DML statements (INSERT, UPDATE, DELETE, DROP, ...).\n\
         If the question is unrelated to the database, answer \"I don't know\".\n\
         \n\
         Tools:\n\
         {tools}\n\
         \n\
         Use the following format:\n\
         \n\
         Question: the input question you must answer\n\
         Thought: what to do next\n\
         Action: the tool to use, one of [{names}]\n\
         Action Input: the input to the tool\n\
         Observation: the result of the tool\n\
         ... (Thought/Action/Action Input/Observation can repeat)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original question",
        dialect = dialect,
        top_k = top_k,
        tools = tool_lines.join("\n"),
        names = tool_names.join(", "),
    )
}

/// Render the question plus everything done so far
pub fn user_prompt(question: &str, scratchpad: &[ScratchpadEntry]) -> String {
    let mut prompt = format!(
        "Begin!\n\nQuestion: {}\nThought: I should look at the tables in the database to see \
         what I can query. Then I should query the schema of the most relevant tables.\n",
        question.trim()
    );
    for entry in scratchpad {
        prompt.push_str(entry.model_output.trim_end());
        prompt.push_str("\nObservation: ");
        prompt.push_str(&entry.observation);
        prompt.push_str("\nThought: ");
    }
    prompt
}

/// Messages for one iteration
pub fn build_messages(
    system: &str,
    question: &str,
    scratchpad: &[ScratchpadEntry],
) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(system),
        PromptMessage::user(user_prompt(question, scratchpad)),
    ]
}

/// Parse one model reply
pub fn parse_output(text: &str) -> Result<AgentDecision, ParseError> {
    let action_pos = text.find(ACTION_MARKER);
    let final_pos = text.find(FINAL_ANSWER_MARKER);

    if let Some(action_pos) = action_pos {
        let after_action = &text[action_pos + ACTION_MARKER.len()..];
        let Some(input_pos) = after_action.find(ACTION_INPUT_MARKER) else {
            return Err(ParseError {
                feedback: "Invalid Format: Missing 'Action Input:' after 'Action:'".to_string(),
            });
        };

        if final_pos.is_some() {
            return Err(ParseError {
                feedback: "Invalid Format: reply contains both an action and a final answer. \
                           Give either one action or the final answer."
                    .to_string(),
            });
        }

        let tool = after_action[..input_pos].trim().trim_matches('`').to_string();
        let raw_input = &after_action[input_pos + ACTION_INPUT_MARKER.len()..];
        let input = clean_action_input(raw_input);
        if tool.is_empty() {
            return Err(ParseError {
                feedback: "Invalid Format: 'Action:' must name a tool".to_string(),
            });
        }

        return Ok(AgentDecision::Action {
            thought: clean_thought(&text[..action_pos]),
            tool,
            input,
        });
    }

    if let Some(final_pos) = final_pos {
        let answer = text[final_pos + FINAL_ANSWER_MARKER.len()..].trim().to_string();
        if answer.is_empty() {
            return Err(ParseError {
                feedback: "Invalid Format: 'Final Answer:' must be followed by the answer"
                    .to_string(),
            });
        }
        return Ok(AgentDecision::Finish {
            thought: clean_thought(&text[..final_pos]),
            answer,
        });
    }

    Err(ParseError {
        feedback: "Invalid Format: Missing 'Action:' after 'Thought:'".to_string(),
    })
}

fn clean_thought(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("Thought:")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn clean_action_input(raw: &str) -> String {
    let mut input = raw;
    if let Some(end) = input.find(OBSERVATION_STOP) {
        input = &input[..end];
    }
    let input = input.trim();

    // Strip a markdown fence the model may wrap SQL in
    let input = input
        .strip_prefix("```sql")
        .or_else(|| input.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(input)
        .trim();

    input.trim_matches('"').trim().to_string()
}
