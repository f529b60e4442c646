//! GraphQL documents used by [`PlatformClient`](crate::PlatformClient).

pub const EXECUTION_METADATA: &str = r#"
query executionMetadata($id: ID!) {
  executionResult(id: $id) {
    id
    startedAt
    status
    stepCount
    instance { id name }
    flow { name }
  }
}
"#;

pub const EXECUTION_LOGS: &str = r#"
query executionLogs($executionId: ID!, $first: Int, $after: String) {
  logs(
    executionResult: $executionId
    first: $first
    after: $after
    orderBy: { direction: DESC, field: TIMESTAMP }
  ) {
    totalCount
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        id
        stepName
        message
        loopStepName
        loopStepIndex
        loopPath
        timestamp
      }
    }
  }
}
"#;

pub const EXECUTION_STEP_RESULTS: &str = r#"
query executionStepResults(
  $executionId: ID!
  $first: Int
  $after: String
  $isRootResult: Boolean
  $loopPath: String
  $startedAtGte: DateTime
) {
  executionResult(id: $executionId) {
    stepResults(
      first: $first
      after: $after
      isRootResult: $isRootResult
      loopPath: $loopPath
      startedAt_Gte: $startedAtGte
      orderBy: { direction: ASC, field: STARTED_AT }
    ) {
      pageInfo { hasNextPage endCursor }
      nodes {
        id
        startedAt
        endedAt
        loopStepIndex
        loopStepName
        stepName
        displayStepName
        isLoopStep
        isRootResult
        loopPath
        hasError
        resultsUrl
      }
    }
  }
}
"#;

pub const LINKED_EXECUTIONS: &str = r#"
query linkedExecutions($executionId: ID!) {
  executionResults(
    invokedBy: $executionId
    orderBy: { direction: ASC, field: STARTED_AT }
  ) {
    nodes {
      id
      startedAt
      endedAt
      status
      flow { name }
      lineage {
        hasChildren
        invokedBy { execution { id } }
      }
    }
  }
}
"#;

pub const REPLAY_EXECUTION: &str = r#"
mutation replayExecution($id: ID!) {
  replayExecution(input: { id: $id }) {
    instanceExecutionResult { id }
    errors { field messages }
  }
}
"#;
