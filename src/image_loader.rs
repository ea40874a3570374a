use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::image_cache::{FetchError, ImageCache};
use crate::picture::Picture;

/// A finished lookup. `id` matches the value returned by
/// [`ImageLoader::request`] so callers can drop replies for rounds that are
/// already over.
#[derive(Debug)]
pub struct ImageReply {
    pub id: u64,
    pub image_ref: String,
    pub result: Result<Picture, FetchError>,
}

struct Worker {
    id: u64,
    image_ref: String,
    handle: JoinHandle<()>,
}

/// Looks pictures up off the UI thread, one worker per request, so a slow
/// download for a skipped round never holds up the next one.
pub struct ImageLoader {
    cache: Arc<ImageCache>,
    max_cols: u16,
    max_rows: u16,
    tx: Sender<ImageReply>,
    rx: Receiver<ImageReply>,
    workers: Vec<Worker>,
    next_id: u64,
}

impl ImageLoader {
    pub fn new(cache: ImageCache, max_cols: u16, max_rows: u16) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            cache: Arc::new(cache),
            max_cols,
            max_rows,
            tx,
            rx,
            workers: Vec::new(),
            next_id: 0,
        }
    }

    /// Starts a lookup and returns its id.
    pub fn request(&mut self, image_ref: &str) -> Result<u64, FetchError> {
        self.next_id += 1;
        let id = self.next_id;

        let cache = Arc::clone(&self.cache);
        let tx = self.tx.clone();
        let (max_cols, max_rows) = (self.max_cols, self.max_rows);
        let owned_ref = image_ref.to_string();

        let handle = thread::Builder::new()
            .name(format!("image-loader-{id}"))
            .spawn(move || {
                let result = cache.resolve(&owned_ref).and_then(|path| {
                    Picture::load(&path, max_cols, max_rows).map_err(FetchError::from)
                });
                if let Err(err) = &result {
                    warn!(image = %owned_ref, error = %err, "image unavailable");
                }
                // the loader may be gone already; nobody is waiting then
                let _ = tx.send(ImageReply {
                    id,
                    image_ref: owned_ref,
                    result,
                });
            })?;

        self.workers.push(Worker {
            id,
            image_ref: image_ref.to_string(),
            handle,
        });
        Ok(id)
    }

    /// Next finished lookup, if any. A worker that died without answering
    /// shows up as [`FetchError::WorkerGone`].
    pub fn try_recv(&mut self) -> Option<ImageReply> {
        if let Ok(reply) = self.rx.try_recv() {
            return Some(self.retire(reply));
        }

        let pos = self.workers.iter().position(|w| w.handle.is_finished())?;
        let worker = self.workers.swap_remove(pos);
        match worker.handle.join() {
            // it answered after the first check
            Ok(()) => self.rx.try_recv().ok().map(|reply| self.retire(reply)),
            Err(_) => {
                warn!(id = worker.id, image = %worker.image_ref, "image worker panicked");
                Some(ImageReply {
                    id: worker.id,
                    image_ref: worker.image_ref,
                    result: Err(FetchError::WorkerGone),
                })
            }
        }
    }

    /// Lookups still running.
    pub fn in_flight(&self) -> usize {
        self.workers.len()
    }

    fn retire(&mut self, reply: ImageReply) -> ImageReply {
        self.workers.retain(|w| w.id != reply.id);
        debug!(id = reply.id, image = %reply.image_ref, "image lookup done");
        reply
    }
}
