use crate::config::AppConfig;
use crate::error::AppError;
use crate::metadata::{FaceDescriptor, NewFaceDescriptor, NewPhoto, Photo, PhotoId, DATE_FORMAT};
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, INDEXED, STORED, STRING};
use tantivy::{Document, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, Term};
use uuid::Uuid;

const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Clone, Copy)]
struct PhotoFields {
    id: Field,
    name: Field,
    date_created: Field,
    meta_data: Field,
    trashed: Field,
}

#[derive(Clone, Copy)]
struct FaceFields {
    id: Field,
    label: Field,
    descriptors: Field,
}

/// One index plus the single writer allowed on it.
#[derive(Clone)]
struct IndexHandle<F> {
    reader: IndexReader,
    writer: Arc<Mutex<IndexWriter>>,
    fields: F,
}

impl<F> IndexHandle<F> {
    fn open(path: &Path, schema: Schema, fields: F) -> Result<Self, AppError> {
        std::fs::create_dir_all(path)?;
        let directory = MmapDirectory::open(path)?;
        let index = Index::open_or_create(directory, schema)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;
        Ok(Self {
            reader,
            writer: Arc::new(Mutex::new(writer)),
            fields,
        })
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, IndexWriter>, AppError> {
        self.writer
            .lock()
            .map_err(|_| AppError::Storage("index writer lock poisoned".to_string()))
    }

    /// Commits pending changes and makes them visible to the next search.
    fn commit(&self, writer: &mut IndexWriter) -> Result<(), AppError> {
        writer.commit()?;
        self.reader.reload()?;
        log::trace!("Tantivy index writer committed changes.");
        Ok(())
    }
}

fn collect_docs(searcher: &Searcher, query: &dyn Query) -> Result<Vec<Document>, AppError> {
    let limit = (searcher.num_docs() as usize).max(1);
    let top_docs = searcher.search(query, &TopDocs::with_limit(limit))?;
    top_docs
        .into_iter()
        .map(|(_score, address)| searcher.doc(address).map_err(AppError::from))
        .collect()
}

fn text(doc: &Document, field: Field) -> Option<&str> {
    doc.get_first(field).and_then(|v| v.as_text())
}

fn parse_id(value: Option<&str>) -> Result<Uuid, AppError> {
    let value = value.ok_or_else(|| AppError::Storage("stored document has no id".to_string()))?;
    Uuid::parse_str(value).map_err(|e| AppError::Storage(format!("stored id {:?} is invalid: {}", value, e)))
}

impl PhotoFields {
    fn schema() -> (Schema, Self) {
        let mut builder = Schema::builder();
        let fields = Self {
            id: builder.add_text_field("id", STRING | STORED),
            name: builder.add_text_field("name", STRING | STORED),
            date_created: builder.add_text_field("date_created", STORED),
            meta_data: builder.add_text_field("meta_data", STORED),
            trashed: builder.add_u64_field("trashed", INDEXED | STORED),
        };
        (builder.build(), fields)
    }

    fn to_document(&self, photo: &Photo) -> Document {
        let mut doc = Document::default();
        doc.add_text(self.id, &photo.id.to_string());
        doc.add_text(self.name, &photo.name);
        doc.add_text(self.date_created, &photo.date_created.format(DATE_FORMAT).to_string());
        doc.add_text(self.meta_data, &photo.meta_data);
        doc.add_u64(self.trashed, photo.trashed as u64);
        doc
    }

    fn from_document(&self, doc: &Document) -> Result<Photo, AppError> {
        let date = text(doc, self.date_created).unwrap_or_default();
        Ok(Photo {
            id: parse_id(text(doc, self.id))?,
            name: text(doc, self.name).unwrap_or_default().to_string(),
            date_created: NaiveDateTime::parse_from_str(date, DATE_FORMAT)
                .map_err(|e| AppError::Storage(format!("stored date {:?} is invalid: {}", date, e)))?,
            meta_data: text(doc, self.meta_data).unwrap_or_default().to_string(),
            trashed: doc.get_first(self.trashed).and_then(|v| v.as_u64()).unwrap_or(0) != 0,
        })
    }

    fn id_term(&self, id: &PhotoId) -> Term {
        Term::from_field_text(self.id, &id.to_string())
    }
}

impl FaceFields {
    fn schema() -> (Schema, Self) {
        let mut builder = Schema::builder();
        let fields = Self {
            id: builder.add_text_field("id", STRING | STORED),
            label: builder.add_text_field("label", STRING | STORED),
            descriptors: builder.add_text_field("descriptors", STORED),
        };
        (builder.build(), fields)
    }

    fn to_document(&self, face: &FaceDescriptor) -> Result<Document, AppError> {
        let mut doc = Document::default();
        doc.add_text(self.id, &face.id.to_string());
        doc.add_text(self.label, &face.label);
        doc.add_text(self.descriptors, &serde_json::to_string(&face.descriptors)?);
        Ok(doc)
    }

    fn from_document(&self, doc: &Document) -> Result<FaceDescriptor, AppError> {
        Ok(FaceDescriptor {
            id: parse_id(text(doc, self.id))?,
            label: text(doc, self.label).unwrap_or_default().to_string(),
            descriptors: serde_json::from_str(text(doc, self.descriptors).unwrap_or("[]"))?,
        })
    }
}

/// Record store backed by two on-disk tantivy indexes, `photos/` and `faces/`.
pub struct TantivyStore {
    photos: IndexHandle<PhotoFields>,
    faces: IndexHandle<FaceFields>,
}

impl TantivyStore {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let root = Path::new(&config.tantivy_index_path);
        log::debug!("Initializing Tantivy record store at {:?}", root);

        let (photo_schema, photo_fields) = PhotoFields::schema();
        let (face_schema, face_fields) = FaceFields::schema();
        let store = Self {
            photos: IndexHandle::open(&root.join("photos"), photo_schema, photo_fields)?,
            faces: IndexHandle::open(&root.join("faces"), face_schema, face_fields)?,
        };

        log::debug!("Tantivy record store initialized successfully.");
        Ok(store)
    }
}

#[async_trait]
impl RecordStore for TantivyStore {
    async fn insert_photo(&self, photo: NewPhoto) -> Result<Photo, AppError> {
        let photo = photo.into_photo(Uuid::new_v4());
        let handle = self.photos.clone();
        let doc = handle.fields.to_document(&photo);

        tokio::task::spawn_blocking(move || {
            let mut writer = handle.lock_writer()?;
            writer.add_document(doc)?;
            handle.commit(&mut writer)
        })
        .await??;

        log::debug!("Photo {} saved at id: {}", photo.name, photo.id);
        Ok(photo)
    }

    async fn find_photos(&self, trashed: bool) -> Result<Vec<Photo>, AppError> {
        let handle = self.photos.clone();

        tokio::task::spawn_blocking(move || {
            let fields = handle.fields;
            let searcher = handle.reader.searcher();
            let query = TermQuery::new(
                Term::from_field_u64(fields.trashed, trashed as u64),
                IndexRecordOption::Basic,
            );
            let mut photos = collect_docs(&searcher, &query)?
                .iter()
                .map(|doc| fields.from_document(doc))
                .collect::<Result<Vec<_>, _>>()?;
            photos.sort_by(|a, b| a.date_created.cmp(&b.date_created).then_with(|| a.name.cmp(&b.name)));
            Ok::<_, AppError>(photos)
        })
        .await?
    }

    async fn trash_photos(&self, ids: &[PhotoId]) -> Result<u64, AppError> {
        let handle = self.photos.clone();
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        tokio::task::spawn_blocking(move || {
            let fields = handle.fields;
            let mut writer = handle.lock_writer()?;
            let searcher = handle.reader.searcher();
            let mut modified = 0;

            for id in &ids {
                let term = fields.id_term(id);
                let query = TermQuery::new(term.clone(), IndexRecordOption::Basic);
                for doc in collect_docs(&searcher, &query)? {
                    let mut photo = fields.from_document(&doc)?;
                    if photo.trashed {
                        continue;
                    }
                    photo.trashed = true;
                    writer.delete_term(term.clone());
                    writer.add_document(fields.to_document(&photo))?;
                    modified += 1;
                }
            }

            if modified > 0 {
                handle.commit(&mut writer)?;
            }
            Ok::<_, AppError>(modified)
        })
        .await?
    }

    async fn delete_photos(&self, ids: &[PhotoId]) -> Result<u64, AppError> {
        let handle = self.photos.clone();
        let ids = ids.to_vec();

        tokio::task::spawn_blocking(move || {
            let fields = handle.fields;
            let mut writer = handle.lock_writer()?;
            let searcher = handle.reader.searcher();
            let mut deleted = 0;

            for id in &ids {
                let term = fields.id_term(id);
                let query = TermQuery::new(term.clone(), IndexRecordOption::Basic);
                let matches = collect_docs(&searcher, &query)?.len() as u64;
                if matches > 0 {
                    writer.delete_term(term);
                    deleted += matches;
                }
            }

            if deleted > 0 {
                handle.commit(&mut writer)?;
            }
            Ok::<_, AppError>(deleted)
        })
        .await?
    }

    async fn delete_all_photos(&self) -> Result<u64, AppError> {
        let handle = self.photos.clone();

        tokio::task::spawn_blocking(move || {
            let mut writer = handle.lock_writer()?;
            let deleted = handle.reader.searcher().num_docs();
            writer.delete_all_documents()?;
            handle.commit(&mut writer)?;
            Ok::<_, AppError>(deleted)
        })
        .await?
    }

    async fn insert_faces(&self, faces: Vec<NewFaceDescriptor>) -> Result<Vec<FaceDescriptor>, AppError> {
        let handle = self.faces.clone();
        let faces: Vec<FaceDescriptor> = faces
            .into_iter()
            .map(|f| f.into_face(Uuid::new_v4()))
            .collect();
        let docs = faces
            .iter()
            .map(|f| handle.fields.to_document(f))
            .collect::<Result<Vec<_>, _>>()?;

        tokio::task::spawn_blocking(move || {
            let mut writer = handle.lock_writer()?;
            for doc in docs {
                writer.add_document(doc)?;
            }
            handle.commit(&mut writer)
        })
        .await??;

        Ok(faces)
    }

    async fn find_faces(&self) -> Result<Vec<FaceDescriptor>, AppError> {
        let handle = self.faces.clone();

        tokio::task::spawn_blocking(move || {
            let fields = handle.fields;
            let searcher = handle.reader.searcher();
            let mut faces = collect_docs(&searcher, &AllQuery)?
                .iter()
                .map(|doc| fields.from_document(doc))
                .collect::<Result<Vec<_>, _>>()?;
            faces.sort_by(|a, b| a.label.cmp(&b.label));
            Ok::<_, AppError>(faces)
        })
        .await?
    }

    async fn delete_all_faces(&self) -> Result<u64, AppError> {
        let handle = self.faces.clone();

        tokio::task::spawn_blocking(move || {
            let mut writer = handle.lock_writer()?;
            let deleted = handle.reader.searcher().num_docs();
            writer.delete_all_documents()?;
            handle.commit(&mut writer)?;
            Ok::<_, AppError>(deleted)
        })
        .await?
    }
}
