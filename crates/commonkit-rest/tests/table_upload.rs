//! Upload scenarios for `TableUploadField` driven through a serializer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use commonkit_core::{CommonkitError, CommonkitResult, ValidationError};
use commonkit_http::UploadedFile;
use commonkit_rest::table::{default_formats, read_csv, FormatHandler, HandlerRegistry};
use commonkit_rest::{
    CharField, FieldExt, IntegerField, Row, RowValidatorSpec, Serializer, SerializerClass,
    SerializerContext, Table, TableUploadField,
};
use serde_json::{json, Value as Json};

fn import_serializer(field: TableUploadField) -> Serializer {
    Serializer::builder("ImportSerializer")
        .field("people", field)
        .build(SerializerContext::new())
        .unwrap()
}

fn with_upload(serializer: Serializer, name: &str, content: &[u8]) -> Serializer {
    serializer.with_data(json!({})).with_files(HashMap::from([(
        "people".to_string(),
        UploadedFile::new(name, content.to_vec()),
    )]))
}

fn ten_rows() -> Vec<u8> {
    let mut csv = String::from("name,age\n");
    for i in 0..10 {
        csv.push_str(&format!("person{i},{}\n", 20 + i));
    }
    csv.into_bytes()
}

#[test]
fn test_csv_tsv_and_json_fixtures_agree() {
    let csv = b"name,age\nann,41\nbob,35\n".as_slice();
    let tsv = b"name\tage\nann\t41\nbob\t35\n".as_slice();
    let json = br#"[{"name": "ann", "age": 41}, {"name": "bob", "age": 35}]"#.as_slice();

    let mut tables = Vec::new();
    for (name, content) in [("people.csv", csv), ("people.tsv", tsv), ("people.json", json)] {
        let field = TableUploadField::new(default_formats()).unwrap();
        let mut serializer = with_upload(import_serializer(field), name, content);
        assert!(serializer.is_valid().unwrap(), "{name}: {:?}", serializer.errors());
        let table = serializer.validated_data().unwrap().get_table("people").unwrap().clone();
        assert_eq!(table.len(), 2);
        let mut columns = table.columns().to_vec();
        columns.sort();
        assert_eq!(columns, ["age", "name"]);
        tables.push(table);
    }
    assert_eq!(tables[0].to_json(), tables[1].to_json());
    assert_eq!(tables[1].to_json(), tables[2].to_json());
}

#[test]
fn test_unregistered_extension() {
    let registry = HandlerRegistry::new().register("csv", FormatHandler::parse(read_csv));
    let field = TableUploadField::new(registry).unwrap();
    let mut serializer = with_upload(import_serializer(field), "report.txt", b"a,b\n1,2\n");

    assert!(!serializer.is_valid().unwrap());
    assert_eq!(
        serializer.errors().unwrap().detail(),
        json!({"people": ["a handler for format=txt was not defined"]})
    );
}

#[test]
fn test_row_failure_is_fail_fast() {
    let visited = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&visited);
    let validator = Arc::new(
        move |row: &Row, index: usize, _table: &Arc<Table>| -> CommonkitResult<Option<Row>> {
            seen.lock().unwrap().push(index);
            if index == 3 {
                return Err(ValidationError::for_field(
                    "age",
                    ValidationError::new(format!("{} is too old", row["age"]), "invalid"),
                )
                .into());
            }
            Ok(None)
        },
    );

    let field = TableUploadField::new(default_formats())
        .unwrap()
        .row_validator(RowValidatorSpec::Callable(validator));
    let mut serializer = with_upload(import_serializer(field), "people.csv", &ten_rows());

    assert!(!serializer.is_valid().unwrap());
    assert_eq!(
        serializer.errors().unwrap().detail(),
        json!({"people": {"row": 3, "field_errors": {"age": ["23 is too old"]}}})
    );
    assert_eq!(*visited.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_other_errors_propagate_unchanged() {
    let validator = Arc::new(|_: &Row, _: usize, _: &Arc<Table>| -> CommonkitResult<Option<Row>> {
        Err(CommonkitError::InternalServerError("database is gone".into()))
    });
    let field = TableUploadField::new(default_formats())
        .unwrap()
        .row_validator(RowValidatorSpec::Callable(validator));
    let mut serializer = with_upload(import_serializer(field), "people.csv", &ten_rows());

    let err = serializer.is_valid().unwrap_err();
    assert!(matches!(err, CommonkitError::InternalServerError(_)));
}

#[test]
fn test_named_method_receives_the_table() {
    let serializer = Serializer::builder("ImportSerializer")
        .field(
            "people",
            TableUploadField::new(default_formats())
                .unwrap()
                .row_validator(RowValidatorSpec::Method("check_person".into())),
        )
        .method("check_person", |row, index, table| {
            let mut row = row.clone();
            row.insert("of".into(), json!(format!("{}/{}", index + 1, table.len())));
            Ok(Some(row))
        })
        .build(SerializerContext::new())
        .unwrap();
    let mut serializer = with_upload(serializer, "people.csv", b"name\nann\nbob\n");

    assert!(serializer.is_valid().unwrap());
    let table = serializer.validated_data().unwrap().get_table("people").unwrap();
    assert_eq!(table.columns(), ["name", "of"]);
    assert_eq!(table.column("of"), [&json!("1/2"), &json!("2/2")]);
    assert_eq!(
        table.to_json(),
        json!([{"name": "ann", "of": "1/2"}, {"name": "bob", "of": "2/2"}])
    );
}

struct PersonRowSerializer;

impl SerializerClass for PersonRowSerializer {
    fn name(&self) -> &str {
        "PersonRowSerializer"
    }

    fn build(&self, context: SerializerContext) -> CommonkitResult<Serializer> {
        Serializer::builder(self.name())
            .field("name", CharField::new().max_length(5))
            .field("age", IntegerField::new().min_value(0))
            .create(|data, context| {
                let mut saved = data.to_json();
                let index = context.row().map_or(Json::Null, |row| json!(row.index));
                saved["row"] = index;
                Ok(saved)
            })
            .build(context)
    }
}

#[test]
fn test_serializer_class_validates_and_saves_each_row() {
    let field = TableUploadField::new(default_formats())
        .unwrap()
        .row_validator(RowValidatorSpec::Serializer(Arc::new(PersonRowSerializer)));
    let mut serializer = with_upload(
        import_serializer(field),
        "people.csv",
        b"name,age\nann,41\nbob,7\n",
    );

    assert!(serializer.is_valid().unwrap());
    let table = serializer.validated_data().unwrap().get_table("people").unwrap();
    assert_eq!(
        table.to_json(),
        json!([{"name": "ann", "age": 41, "row": 0}, {"name": "bob", "age": 7, "row": 1}])
    );
}

/// Numbers each row against the table it came from and links it to the
/// previous row's number.
struct TallyRowSerializer;

impl SerializerClass for TallyRowSerializer {
    fn name(&self) -> &str {
        "TallyRowSerializer"
    }

    fn build(&self, context: SerializerContext) -> CommonkitResult<Serializer> {
        Serializer::builder(self.name())
            .field("name", CharField::new())
            .create(|data, context| {
                let mut saved = data.to_json();
                let Some(row) = context.row() else {
                    return Ok(saved);
                };
                saved["position"] = json!(format!("{}/{}", row.index + 1, row.table.len()));
                saved["previous"] = row
                    .index
                    .checked_sub(1)
                    .and_then(|previous| row.table.row(previous))
                    .and_then(|previous| previous.get("position").cloned())
                    .unwrap_or(Json::Null);
                Ok(saved)
            })
            .build(context)
    }
}

#[test]
fn test_serializer_class_sees_the_whole_table() {
    let field = TableUploadField::new(default_formats())
        .unwrap()
        .row_validator(RowValidatorSpec::Serializer(Arc::new(TallyRowSerializer)));
    let mut serializer = with_upload(import_serializer(field), "people.csv", b"name\nann\nbob\n");

    assert!(serializer.is_valid().unwrap(), "{:?}", serializer.errors());
    let table = serializer.validated_data().unwrap().get_table("people").unwrap();
    assert_eq!(
        table.to_json(),
        json!([
            {"name": "ann", "position": "1/2", "previous": null},
            {"name": "bob", "position": "2/2", "previous": "1/2"},
        ])
    );
}

#[test]
fn test_serializer_class_errors_carry_the_row() {
    let field = TableUploadField::new(default_formats())
        .unwrap()
        .row_validator(RowValidatorSpec::Serializer(Arc::new(PersonRowSerializer)));
    let mut serializer = with_upload(
        import_serializer(field),
        "people.csv",
        b"name,age\nann,41\nbernadette,7\n",
    );

    assert!(!serializer.is_valid().unwrap());
    assert_eq!(
        serializer.errors().unwrap().detail(),
        json!({"people": {
            "row": 1,
            "field_errors": {"name": ["Ensure this field has no more than 5 characters."]},
        }})
    );
}

#[test]
fn test_missing_upload_is_required() {
    let field = TableUploadField::new(default_formats()).unwrap();
    let mut serializer = import_serializer(field).with_data(json!({}));
    assert!(!serializer.is_valid().unwrap());
    assert_eq!(
        serializer.errors().unwrap().detail(),
        json!({"people": ["This field is required."]})
    );

    let field = TableUploadField::new(default_formats()).unwrap().required(false);
    let mut serializer = import_serializer(field).with_data(json!({}));
    assert!(serializer.is_valid().unwrap());
}
