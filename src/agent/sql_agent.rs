//! SQL query agent
//!
//! Answers a natural-language question by letting the model plan and run SQL
//! through the [`SqlToolkit`] until it produces a final answer.

use crate::agent::observer::{AgentStep, StepObserver};
use crate::agent::prompt::{
    build_messages, parse_output, system_prompt, AgentDecision, ScratchpadEntry, OBSERVATION_STOP,
};
use crate::agent::tools::{SqlTool, SqlToolkit};
use crate::config::AgentConfig;
use crate::database::DatabaseHandle;
use crate::error::AppError;
use crate::llm::ModelHandle;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Anything that can turn a question into an answer
///
/// The interaction loop depends only on this, so a different agent (remote,
/// scripted, ...) can be dropped in.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    /// Answer `question`, pushing intermediate steps to `observer`
    ///
    /// # Errors
    /// * `AppError::Agent` if the model fails or no answer is reached
    /// * `AppError::Configuration` or `AppError::Connection` if the database
    ///   cannot be provisioned for this question
    async fn run(&self, question: &str, observer: &dyn StepObserver) -> Result<String, AppError>;
}

/// Zero-shot reasoning agent over a SQL database
pub struct SqlAgent {
    toolkit: SqlToolkit,
    model: ModelHandle,
    max_iterations: usize,
    top_k: usize,
}

/// Compose a database handle and a model handle into an agent
pub fn create_agent(db: DatabaseHandle, model: ModelHandle, config: &AgentConfig) -> Arc<SqlAgent> {
    Arc::new(SqlAgent {
        toolkit: SqlToolkit::new(db, model.clone()),
        model,
        max_iterations: config.max_iterations.max(1),
        top_k: config.top_k,
    })
}

impl SqlAgent {
    async fn answer(&self, question: &str, observer: &dyn StepObserver) -> Result<String, AppError> {
        let system = system_prompt(self.toolkit.database().dialect(), self.top_k, &SqlTool::ALL);
        let stop = vec![OBSERVATION_STOP.to_string()];
        let mut scratchpad: Vec<ScratchpadEntry> = Vec::new();

        for iteration in 1..=self.max_iterations {
            let messages = build_messages(&system, question, &scratchpad);
            let output = self.model.complete(&messages, &stop, observer).await?;

            debug!(iteration, output_len = output.len(), "Agent iteration");

            let observation = match parse_output(&output) {
                Ok(AgentDecision::Finish { thought, answer }) => {
                    if !thought.is_empty() {
                        observer.on_step(AgentStep::Thought { text: thought });
                    }
                    observer.on_step(AgentStep::FinalAnswer {
                        text: answer.clone(),
                    });
                    info!(iterations = iteration, "Agent reached a final answer");
                    return Ok(answer);
                }
                Ok(AgentDecision::Action {
                    thought,
                    tool,
                    input,
                }) => {
                    if !thought.is_empty() {
                        observer.on_step(AgentStep::Thought { text: thought });
                    }
                    observer.on_step(AgentStep::Action {
                        tool: tool.clone(),
                        input: input.clone(),
                    });
                    self.toolkit.invoke(&tool, &input, observer).await
                }
                Err(parse_error) => {
                    warn!(iteration, "Could not parse model output");
                    parse_error.feedback
                }
            };

            observer.on_step(AgentStep::Observation {
                text: observation.clone(),
            });
            scratchpad.push(ScratchpadEntry {
                model_output: output,
                observation,
            });
        }

        Err(AppError::Agent(format!(
            "Agent stopped after {} iterations without reaching an answer",
            self.max_iterations
        )))
    }
}

#[async_trait]
impl QueryAgent for SqlAgent {
    async fn run(&self, question: &str, observer: &dyn StepObserver) -> Result<String, AppError> {
        info!(
            model = %self.model.model_id(),
            dialect = %self.toolkit.database().dialect(),
            question_len = question.len(),
            "Running SQL agent"
        );

        self.answer(question, observer).await.map_err(|e| match e {
            AppError::Agent(msg) => AppError::Agent(msg),
            other => AppError::Agent(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::observer::RecordingObserver;
    use crate::test_support::{seed_students_db, ScriptedModel};

    fn agent_config(max_iterations: usize) -> AgentConfig {
        AgentConfig {
            max_iterations,
            top_k: 10,
        }
    }

    #[tokio::test]
    async fn test_answers_row_count_question() {
        let (_dir, db) = seed_students_db().await;
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Action: sql_db_list_tables\nAction Input: ".to_string()),
            Ok("The students table looks relevant.\nAction: sql_db_query\nAction Input: SELECT COUNT(*) FROM students".to_string()),
            Ok("I now know the final answer\nFinal Answer: There are 5 rows in the students table.".to_string()),
        ]));
        let agent = create_agent(db, model.clone(), &agent_config(15));
        let observer = RecordingObserver::new();

        let answer = agent
            .run("How many rows are in the students table?", &observer)
            .await
            .unwrap();

        assert_eq!(answer, "There are 5 rows in the students table.");
        assert_eq!(
            observer.trace(),
            vec![
                AgentStep::Action {
                    tool: "sql_db_list_tables".to_string(),
                    input: String::new(),
                },
                AgentStep::Observation {
                    text: "students".to_string(),
                },
                AgentStep::Thought {
                    text: "The students table looks relevant.".to_string(),
                },
                AgentStep::Action {
                    tool: "sql_db_query".to_string(),
                    input: "SELECT COUNT(*) FROM students".to_string(),
                },
                AgentStep::Observation {
                    text: "[(5,)]".to_string(),
                },
                AgentStep::Thought {
                    text: "I now know the final answer".to_string(),
                },
                AgentStep::FinalAnswer {
                    text: "There are 5 rows in the students table.".to_string(),
                },
            ]
        );

        // The last prompt carries the whole scratchpad
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2][1].content.contains("Observation: [(5,)]"));
    }

    #[tokio::test]
    async fn test_recovers_from_bad_sql_and_bad_format() {
        let (_dir, db) = seed_students_db().await;
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Action: sql_db_query\nAction Input: SELECT COUNT(*) FROM student".to_string()),
            Ok("Hmm, let me think about this differently.".to_string()),
            Ok("Action: sql_db_query\nAction Input: SELECT COUNT(*) FROM students".to_string()),
            Ok("Final Answer: 5".to_string()),
        ]));
        let agent = create_agent(db, model.clone(), &agent_config(15));
        let observer = RecordingObserver::new();

        let answer = agent.run("How many students?", &observer).await.unwrap();
        assert_eq!(answer, "5");

        let observations: Vec<String> = observer
            .trace()
            .into_iter()
            .filter_map(|s| match s {
                AgentStep::Observation { text } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(observations.len(), 3);
        assert!(observations[0].starts_with("Error:"));
        assert!(observations[1].starts_with("Invalid Format"));
        assert_eq!(observations[2], "[(5,)]");
    }

    #[tokio::test]
    async fn test_iteration_limit_is_single_agent_error() {
        let (_dir, db) = seed_students_db().await;
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Action: sql_db_list_tables\nAction Input: ".to_string()),
            Ok("Action: sql_db_list_tables\nAction Input: ".to_string()),
            Ok("Action: sql_db_list_tables\nAction Input: ".to_string()),
        ]));
        let agent = create_agent(db, model.clone(), &agent_config(2));
        let observer = RecordingObserver::new();

        let err = agent.run("loop forever", &observer).await.unwrap_err();
        assert!(matches!(err, AppError::Agent(_)));
        assert!(err.to_string().contains("2 iterations"));
        assert_eq!(model.prompts().len(), 2);
        assert!(!observer
            .trace()
            .iter()
            .any(|s| matches!(s, AgentStep::FinalAnswer { .. })));
    }

    #[tokio::test]
    async fn test_model_failure_is_agent_error() {
        let (_dir, db) = seed_students_db().await;
        let model = Arc::new(ScriptedModel::new(vec![Err(AppError::Internal(
            anyhow::anyhow!("connection reset"),
        ))]));
        let agent = create_agent(db, model, &agent_config(15));

        let err = agent
            .run("How many students?", &RecordingObserver::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Agent(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_each_question_is_planned_afresh() {
        let (_dir, db) = seed_students_db().await;
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("Final Answer: first".to_string()),
            Ok("Final Answer: second".to_string()),
        ]));
        let agent = create_agent(db, model.clone(), &agent_config(15));

        let a = agent.run("same question", &RecordingObserver::new()).await.unwrap();
        let b = agent.run("same question", &RecordingObserver::new()).await.unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("first", "second"));
        assert_eq!(model.prompts().len(), 2);
    }
}
