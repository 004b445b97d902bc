mod common;

use common::{configured, API_KEY};
use hemmer_provider_whisparr::testing::{assert_plan_no_changes, ProviderTester};
use hemmer_provider_whisparr::{ProviderError, WhisparrProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_tag_lifecycle() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v3/tag"))
        .and(header("X-Api-Key", API_KEY))
        .and(body_partial_json(json!({"label": "vr"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "label": "vr"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/tag/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "label": "vr"})))
        .mount(&server)
        .await;

    let created = tester
        .lifecycle_create("whisparr_tag", json!({"label": "vr"}))
        .await
        .unwrap();
    assert_eq!(created, json!({"id": 1, "label": "vr"}));

    server.reset().await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/tag/1"))
        .and(body_partial_json(json!({"id": 1, "label": "cartoons"})))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"id": 1, "label": "cartoons"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/tag/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "label": "cartoons"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/tag/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let updated = tester
        .lifecycle_update("whisparr_tag", created, json!({"label": "cartoons"}))
        .await
        .unwrap();
    assert_eq!(updated["label"], json!("cartoons"));

    tester.lifecycle_delete("whisparr_tag", updated).await.unwrap();
}

fn import_list_response(enable_auto: bool) -> serde_json::Value {
    json!({
        "id": 5,
        "name": "Upstream",
        "implementation": "WhisparrImport",
        "configContract": "WhisparrSettings",
        "enabled": true,
        "enableAuto": enable_auto,
        "shouldMonitor": true,
        "searchOnAdd": true,
        "minimumAvailability": "released",
        "rootFolderPath": "/movies",
        "qualityProfileId": 1,
        "listType": "program",
        "listOrder": 1,
        "tags": [],
        "fields": [
            {"name": "baseUrl", "value": "http://upstream:6969"},
            {"name": "apiKey", "value": "********"},
            {"name": "profileIds", "value": [1]},
            {"name": "tagIds", "value": []},
            {"name": "rootFolderPaths", "value": ["/movies", "/archive"]}
        ]
    })
}

#[tokio::test]
async fn test_import_list_lifecycle() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    let config = json!({
        "name": "Upstream",
        "implementation": "WhisparrImport",
        "config_contract": "WhisparrSettings",
        "root_folder_path": "/movies",
        "quality_profile_id": 1,
        "base_url": "http://upstream:6969",
        "api_key": "upstream-key",
        "profile_ids": [1],
        "root_folder_paths": ["/movies", "/archive"]
    });

    Mock::given(method("POST"))
        .and(path("/api/v3/importlist"))
        .and(query_param("forceSave", "true"))
        .and(body_partial_json(json!({
            "rootFolderPath": "/movies",
            "minimumAvailability": "released",
            "enableAuto": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(import_list_response(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/importlist/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(import_list_response(true)))
        .mount(&server)
        .await;

    let created = tester
        .lifecycle_create("whisparr_import_list", config.clone())
        .await
        .unwrap();
    assert_eq!(created["id"], json!(5));
    assert_eq!(created["root_folder_paths"], json!(["/movies", "/archive"]));
    assert_eq!(created["profile_ids"], json!([1]));
    assert_eq!(created["api_key"], json!("upstream-key"));
    assert_eq!(created["list_type"], json!("program"));

    server.reset().await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/importlist/5"))
        .and(query_param("forceSave", "true"))
        .and(body_partial_json(json!({"id": 5, "enableAuto": false})))
        .respond_with(ResponseTemplate::new(202).set_body_json(import_list_response(false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/importlist/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(import_list_response(false)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/importlist/5"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut changed = config;
    changed["enable_auto"] = json!(false);
    let updated = tester
        .lifecycle_update("whisparr_import_list", created, changed)
        .await
        .unwrap();
    assert_eq!(updated["enable_auto"], json!(false));
    assert_eq!(updated["root_folder_paths"], json!(["/movies", "/archive"]));

    tester
        .lifecycle_delete("whisparr_import_list", updated)
        .await
        .unwrap();
}

fn download_client_response(category: &str) -> serde_json::Value {
    json!({
        "id": 6,
        "name": "qBittorrent",
        "implementation": "QBittorrent",
        "configContract": "QBittorrentSettings",
        "protocol": "torrent",
        "enable": true,
        "priority": 1,
        "removeCompletedDownloads": true,
        "removeFailedDownloads": true,
        "tags": [],
        "fields": [
            {"name": "host", "value": "qbittorrent"},
            {"name": "port", "value": 8080},
            {"name": "useSsl", "value": false},
            {"name": "username", "value": "admin"},
            {"name": "password", "value": "********"},
            {"name": "movieCategory", "value": category},
            {"name": "tags", "value": ["vr"]},
            {"name": "postImportTags", "value": ["imported"]}
        ]
    })
}

#[tokio::test]
async fn test_download_client_lifecycle() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    let config = json!({
        "name": "qBittorrent",
        "implementation": "QBittorrent",
        "config_contract": "QBittorrentSettings",
        "protocol": "torrent",
        "host": "qbittorrent",
        "port": 8080,
        "username": "admin",
        "password": "adminadmin",
        "movie_category": "whisparr",
        "field_tags": ["vr"],
        "post_import_tags": ["imported"]
    });

    Mock::given(method("POST"))
        .and(path("/api/v3/downloadclient"))
        .and(query_param("forceSave", "true"))
        .and(body_partial_json(json!({
            "name": "qBittorrent",
            "protocol": "torrent",
            "priority": 1
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(download_client_response("whisparr")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/downloadclient/6"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(download_client_response("whisparr")),
        )
        .mount(&server)
        .await;

    let created = tester
        .lifecycle_create("whisparr_download_client", config.clone())
        .await
        .unwrap();
    assert_eq!(created["id"], json!(6));
    assert_eq!(created["password"], json!("adminadmin"));
    assert_eq!(created["field_tags"], json!(["vr"]));
    assert_eq!(created["post_import_tags"], json!(["imported"]));
    assert_eq!(created["use_ssl"], json!(false));

    server.reset().await;
    Mock::given(method("PUT"))
        .and(path("/api/v3/downloadclient/6"))
        .and(query_param("forceSave", "true"))
        .and(body_partial_json(json!({"id": 6})))
        .respond_with(ResponseTemplate::new(202).set_body_json(download_client_response("adult")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/downloadclient/6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(download_client_response("adult")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v3/downloadclient/6"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut changed = config;
    changed["movie_category"] = json!("adult");
    let updated = tester
        .lifecycle_update("whisparr_download_client", created, changed)
        .await
        .unwrap();
    assert_eq!(updated["movie_category"], json!("adult"));
    assert_eq!(updated["password"], json!("adminadmin"));

    tester
        .lifecycle_delete("whisparr_download_client", updated)
        .await
        .unwrap();
}

fn indexer_config() -> serde_json::Value {
    json!({
        "name": "NZBgeek",
        "implementation": "Newznab",
        "config_contract": "NewznabSettings",
        "protocol": "usenet",
        "base_url": "https://api.nzbgeek.info",
        "api_key": "geek-key",
        "categories": [5030, 5040]
    })
}

fn indexer_response() -> serde_json::Value {
    json!({
        "id": 3,
        "name": "NZBgeek",
        "implementation": "Newznab",
        "configContract": "NewznabSettings",
        "protocol": "usenet",
        "enableRss": true,
        "enableAutomaticSearch": true,
        "enableInteractiveSearch": true,
        "priority": 25,
        "downloadClientId": 0,
        "tags": [],
        "fields": [
            {"name": "baseUrl", "value": "https://api.nzbgeek.info"},
            {"name": "apiPath", "value": "/api"},
            {"name": "apiKey", "value": "********"},
            {"name": "categories", "value": [5030, 5040]},
            {"name": "additionalParameters"}
        ]
    })
}

#[tokio::test]
async fn test_indexer_keeps_masked_api_key() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v3/indexer"))
        .and(query_param("forceSave", "true"))
        .and(body_partial_json(json!({
            "name": "NZBgeek",
            "configContract": "NewznabSettings",
            "enableRss": true,
            "priority": 25
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(indexer_response()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/indexer/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(indexer_response()))
        .mount(&server)
        .await;

    let state = tester
        .lifecycle_create("whisparr_indexer", indexer_config())
        .await
        .unwrap();
    assert_eq!(state["id"], json!(3));
    assert_eq!(state["api_key"], json!("geek-key"));
    assert_eq!(state["api_path"], json!("/api"));
    assert!(state["additional_parameters"].is_null());

    let plan = tester
        .plan_update("whisparr_indexer", state, indexer_config())
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_notification_update_uses_force_save() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("PUT"))
        .and(path("/api/v3/notification/9"))
        .and(query_param("forceSave", "true"))
        .and(body_partial_json(json!({"id": 9, "onGrab": true, "onRename": false})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": 9,
            "name": "Discord",
            "implementation": "Discord",
            "configContract": "DiscordSettings",
            "onGrab": true,
            "fields": [{"name": "webHookUrl", "value": "********"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let planned = json!({
        "id": 9,
        "name": "Discord",
        "implementation": "Discord",
        "config_contract": "DiscordSettings",
        "on_grab": true,
        "web_hook_url": "https://discord.com/api/webhooks/1/abc"
    });
    let prior = planned.clone();
    let state = tester
        .update("whisparr_notification", prior, planned)
        .await
        .unwrap();
    assert_eq!(state["web_hook_url"], json!("https://discord.com/api/webhooks/1/abc"));
    assert_eq!(state["on_download"], json!(false));
}

#[tokio::test]
async fn test_quality_profile_create_sends_items() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let response = json!({
        "id": 7,
        "name": "HD",
        "upgradeAllowed": true,
        "cutoff": 1001,
        "minFormatScore": 0,
        "cutoffFormatScore": 0,
        "minUpgradeFormatScore": 1,
        "items": [
            {"quality": {"id": 1, "name": "SDTV"}, "items": [], "allowed": false},
            {"id": 1001, "name": "WEB 1080p", "allowed": true, "items": [
                {"quality": {"id": 3}, "items": [], "allowed": true},
                {"quality": {"id": 15}, "items": [], "allowed": true}
            ]}
        ],
        "formatItems": []
    });
    Mock::given(method("POST"))
        .and(path("/api/v3/qualityprofile"))
        .and(body_partial_json(json!({
            "name": "HD",
            "cutoff": 1001,
            "items": [
                {"quality": {"id": 1}, "allowed": false},
                {"id": 1001, "name": "WEB 1080p", "allowed": true}
            ]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(response))
        .expect(1)
        .mount(&server)
        .await;

    let config = json!({
        "name": "HD",
        "upgrade_allowed": true,
        "cutoff": 1001,
        "quality_groups": [
            {"allowed": false, "qualities": [1]},
            {"id": 1001, "name": "WEB 1080p", "allowed": true, "qualities": [3, 15]}
        ]
    });
    tester
        .validate_resource_config("whisparr_quality_profile", config.clone())
        .await
        .unwrap();
    let plan = tester.plan_create("whisparr_quality_profile", config).await.unwrap();
    let state = tester
        .create("whisparr_quality_profile", plan.planned_state)
        .await
        .unwrap();

    assert_eq!(state["id"], json!(7));
    assert_eq!(state["min_upgrade_format_score"], json!(1));
    assert_eq!(state["quality_groups"][1]["qualities"], json!([3, 15]));
}

#[tokio::test]
async fn test_import_reads_by_id() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/remotepathmapping/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "host": "sabnzbd",
            "remotePath": "/downloads/",
            "localPath": "/data/usenet/"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let imported = tester
        .import_resource("whisparr_remote_path_mapping", "4")
        .await
        .unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, "whisparr_remote_path_mapping");
    assert_eq!(imported[0].state["local_path"], json!("/data/usenet/"));

    let err = tester
        .import_resource("whisparr_remote_path_mapping", "sabnzbd")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_error_mapping() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/api/v3/tag"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([
            {"propertyName": "Label", "errorMessage": "Label is already in use"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/tag/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "NotFound"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/tag/500"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "database is locked",
            "description": "SQLiteException"
        })))
        .mount(&server)
        .await;

    let err = tester
        .create("whisparr_tag", json!({"id": null, "label": "vr"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Validation(_)));
    assert!(err.message().contains("Label: Label is already in use"));

    let err = tester
        .read("whisparr_tag", json!({"id": 404, "label": "gone"}))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = tester
        .read("whisparr_tag", json!({"id": 500, "label": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
    assert!(err.message().contains("database is locked (SQLiteException)"));
}

#[tokio::test]
async fn test_bad_api_key_is_permission_denied() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/v3/delayprofile/1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = tester
        .read("whisparr_delay_profile", json!({"id": 1}))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::PermissionDenied(_)));
    assert!(!err.to_string().contains(API_KEY));
}

#[tokio::test]
async fn test_root_folder_cannot_update() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let err = tester
        .update(
            "whisparr_root_folder",
            json!({"id": 1, "path": "/movies"}),
            json!({"id": 1, "path": "/movies"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Unimplemented(_)));
}

#[tokio::test]
async fn test_extra_headers_are_sent() {
    let server = MockServer::start().await;
    let tester = ProviderTester::new(WhisparrProvider::with_env(|_| None));
    tester
        .configure(json!({
            "url": format!("{}/whisparr", server.uri()),
            "api_key": API_KEY,
            "extra_headers": {"X-Forwarded-User": "hemmer"}
        }))
        .await
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/whisparr/api/v3/tag/2"))
        .and(header("X-Forwarded-User", "hemmer"))
        .and(header("X-Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "label": "kids"})))
        .expect(1)
        .mount(&server)
        .await;

    let state = tester
        .read("whisparr_tag", json!({"id": 2, "label": "kids"}))
        .await
        .unwrap();
    assert_eq!(state["label"], json!("kids"));
}
