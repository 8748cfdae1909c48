//! Request validation through the public helper API

mod common;

use adxkit::testing::ScriptedFactory;
use adxkit::{CancellationToken, Error, ExecutionRequest, Field};
use rstest::rstest;

fn clear(request: &mut ExecutionRequest, field: Field) {
    match field {
        Field::Cluster => request.cluster = None,
        Field::Database => request.database = None,
        Field::Statement => request.statement = None,
        Field::AppId => request.app_id = None,
        Field::AppSecret => request.app_secret = None,
        Field::AppTenant => request.app_tenant = None,
    }
}

fn empty(request: ExecutionRequest, field: Field) -> ExecutionRequest {
    match field {
        Field::Cluster => request.with_cluster(""),
        Field::Database => request.with_database(""),
        Field::Statement => request.with_statement(""),
        Field::AppId => request.with_credentials("", "app-secret", "tenant"),
        Field::AppSecret => request.with_credentials("app-id", "", "tenant"),
        Field::AppTenant => request.with_credentials("app-id", "app-secret", ""),
    }
}

#[rstest]
#[tokio::test]
async fn test_missing_field_rejected_for_both_operations(
    #[values(
        Field::Cluster,
        Field::Database,
        Field::Statement,
        Field::AppId,
        Field::AppSecret,
        Field::AppTenant
    )]
    field: Field,
    #[values(true, false)] as_command: bool,
) {
    let factory = ScriptedFactory::new();
    let (helper, _) = common::scripted_helper(&factory, 2);
    let mut request = common::full_request(".show tables");
    clear(&mut request, field);

    let token = CancellationToken::new();
    let err = if as_command {
        helper.execute_command(&request, &token).await
    } else {
        helper.execute_query(&request, &token).await
    }
    .unwrap_err();

    assert!(matches!(err, Error::MissingValue(f) if f == field));
    assert_eq!(factory.connections_opened(), 0);
}

#[rstest]
#[tokio::test]
async fn test_empty_field_rejected_for_both_operations(
    #[values(
        Field::Cluster,
        Field::Database,
        Field::Statement,
        Field::AppId,
        Field::AppSecret,
        Field::AppTenant
    )]
    field: Field,
    #[values(true, false)] as_command: bool,
) {
    let factory = ScriptedFactory::new();
    let (helper, _) = common::scripted_helper(&factory, 2);
    let request = empty(common::full_request("T | take 1"), field);

    let token = CancellationToken::new();
    let err = if as_command {
        helper.execute_command(&request, &token).await
    } else {
        helper.execute_query(&request, &token).await
    }
    .unwrap_err();

    assert!(matches!(err, Error::InvalidValue(f) if f == field));
    assert!(err.is_validation());
    assert_eq!(factory.attempts(), 0);
}

#[tokio::test]
async fn test_all_missing_reports_cluster() {
    let factory = ScriptedFactory::new();
    let (helper, _) = common::scripted_helper(&factory, 2);

    let err = helper
        .execute_query(&ExecutionRequest::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.field(), Some(Field::Cluster));
}
