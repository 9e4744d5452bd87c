/// Dataset loading from real files on disk
/// Covers format precedence, header spellings and retry after a failed load
use credito_pme_api::dataset::{
    load_from_dir, locate, DatasetError, DatasetFormat, DatasetStore, DATASET_STEM,
};
use parquet::basic::{LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int32Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::Type;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write(dir: &Path, extension: &str, content: &str) -> PathBuf {
    let path = dir.join(format!("{}.{}", DATASET_STEM, extension));
    fs::write(&path, content).unwrap();
    path
}

const CSV: &str = "\u{feff}Empresa,Receita Anual,Dívida Total,Prazo de Pagamento (dias),Setor,Rating,Notícias Recentes,Observação
Alfa Comércio Ltda,900000,300000,75,Comércio,B+,,ignorado
,100,10,30,Serviços,A,,sem nome
Beta Serviços,n/d,50000,30.9,Serviços,a-,Expansão regional,
";

#[test]
fn test_csv_with_accented_headers() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "csv", CSV);

    let dataset = load_from_dir(dir.path()).unwrap();

    assert_eq!(dataset.len(), 2);
    let alfa = dataset.find("ALFA COMÉRCIO LTDA").unwrap();
    assert_eq!(alfa.annual_revenue, Some(900_000.0));
    assert_eq!(alfa.payment_term_days, Some(75));
    assert_eq!(alfa.recent_news, None);

    let beta = dataset.find("beta").unwrap();
    assert_eq!(beta.annual_revenue, None);
    assert_eq!(beta.payment_term_days, Some(30));
    assert_eq!(beta.sector.as_deref(), Some("Serviços"));
}

#[test]
fn test_json_wins_over_csv() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "csv", CSV);
    let json = write(
        dir.path(),
        "json",
        r#"[{"empresa": "Gama", "receita_anual": 10, "divida_total": 1}]"#,
    );

    let (path, format) = locate(dir.path()).unwrap();
    assert_eq!(path, json);
    assert_eq!(format, DatasetFormat::Json);

    let dataset = load_from_dir(dir.path()).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.source(), Some(json.as_path()));
}

#[test]
fn test_ndjson_file() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "json",
        "{\"Empresa\": \"Delta\", \"Receita Anual\": 500}\n\n{\"Empresa\": \"Épsilon\", \"Rating\": \"C\"}\n",
    );

    let dataset = load_from_dir(dir.path()).unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.rows()[1].rating.as_deref(), Some("C"));
}

#[test]
fn test_xml_file() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<data>
  <row>
    <Empresa>Zeta &amp; Filhos</Empresa>
    <Receita_Anual>1200000</Receita_Anual>
    <Divida_Total>100000</Divida_Total>
    <Setor>Indústria</Setor>
  </row>
  <row empresa="Eta" rating="B"/>
</data>"#,
    );

    let dataset = load_from_dir(dir.path()).unwrap();

    assert_eq!(dataset.len(), 2);
    let zeta = dataset.find("zeta & filhos").unwrap();
    assert_eq!(zeta.total_debt, Some(100_000.0));
    assert_eq!(dataset.find("eta").unwrap().rating.as_deref(), Some("B"));
}

fn column(name: &str, physical: PhysicalType, repetition: Repetition) -> Arc<Type> {
    let logical = (physical == PhysicalType::BYTE_ARRAY).then_some(LogicalType::String);
    Arc::new(
        Type::primitive_type_builder(name, physical)
            .with_repetition(repetition)
            .with_logical_type(logical)
            .build()
            .unwrap(),
    )
}

/// Two companies; Beta has no annual revenue.
fn write_parquet(path: &Path) {
    let schema = Arc::new(
        Type::group_type_builder("schema")
            .with_fields(vec![
                column("Empresa", PhysicalType::BYTE_ARRAY, Repetition::REQUIRED),
                column("Receita Anual", PhysicalType::DOUBLE, Repetition::OPTIONAL),
                column("Dívida Total", PhysicalType::DOUBLE, Repetition::OPTIONAL),
                column("Prazo de Pagamento (dias)", PhysicalType::INT32, Repetition::OPTIONAL),
                column("Setor", PhysicalType::BYTE_ARRAY, Repetition::OPTIONAL),
            ])
            .build()
            .unwrap(),
    );
    let props = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(File::create(path).unwrap(), schema, props).unwrap();
    let mut group = writer.next_row_group().unwrap();

    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<ByteArrayType>()
        .write_batch(
            &[ByteArray::from("Alfa Comércio Ltda"), ByteArray::from("Beta Serviços")],
            None,
            None,
        )
        .unwrap();
    col.close().unwrap();

    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<DoubleType>()
        .write_batch(&[900_000.0], Some(&[1, 0]), None)
        .unwrap();
    col.close().unwrap();

    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<DoubleType>()
        .write_batch(&[300_000.0, 50_000.0], Some(&[1, 1]), None)
        .unwrap();
    col.close().unwrap();

    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<Int32Type>()
        .write_batch(&[75, 30], Some(&[1, 1]), None)
        .unwrap();
    col.close().unwrap();

    let mut col = group.next_column().unwrap().unwrap();
    col.typed::<ByteArrayType>()
        .write_batch(
            &[ByteArray::from("Comércio"), ByteArray::from("Serviços")],
            Some(&[1, 1]),
            None,
        )
        .unwrap();
    col.close().unwrap();

    group.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn test_parquet_file_with_accented_headers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(format!("{}.parquet", DATASET_STEM));
    write_parquet(&path);

    let (located, format) = locate(dir.path()).unwrap();
    assert_eq!(located, path);
    assert_eq!(format, DatasetFormat::Parquet);

    let dataset = load_from_dir(dir.path()).unwrap();
    assert_eq!(dataset.len(), 2);

    let alfa = dataset.find("alfa").unwrap();
    assert_eq!(alfa.annual_revenue, Some(900_000.0));
    assert_eq!(alfa.total_debt, Some(300_000.0));
    assert_eq!(alfa.payment_term_days, Some(75));
    assert_eq!(alfa.sector.as_deref(), Some("Comércio"));

    let beta = dataset.find("Beta Serviços").unwrap();
    assert_eq!(beta.annual_revenue, None);
    assert_eq!(beta.total_debt, Some(50_000.0));
}

#[test]
fn test_empty_directory_has_no_dataset() {
    let dir = TempDir::new().unwrap();

    match load_from_dir(dir.path()) {
        Err(DatasetError::NoDatasetFile { dir: missing }) => assert_eq!(missing, dir.path()),
        other => panic!("expected NoDatasetFile, got {:?}", other),
    }
}

#[test]
fn test_invalid_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "json", "[{\"empresa\": ");

    assert!(load_from_dir(dir.path()).is_err());
}

#[tokio::test]
async fn test_store_retries_after_file_appears() {
    let dir = TempDir::new().unwrap();
    let store = DatasetStore::from_dir(dir.path());

    assert!(store.get().await.is_err());
    assert!(!store.is_loaded());

    write(dir.path(), "csv", CSV);
    let dataset = store.get().await.unwrap();

    assert_eq!(dataset.len(), 2);
    assert!(store.is_loaded());
}

#[test]
fn test_bundled_sample_dataset_loads() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let dataset = load_from_dir(&dir).unwrap();

    assert!(!dataset.is_empty());
    let technova = dataset.find("TechNova").unwrap();
    assert_eq!(technova.rating.as_deref(), Some("A"));
    assert_eq!(technova.sector.as_deref(), Some("Tecnologia"));
}
