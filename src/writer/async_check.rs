//! Asynchronous writing of a writer chain into a [`tokio::io::AsyncWrite`] sink.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{BufferedOutput, StagedWrite, WriteState, WriterSettings, XmlWrite};
use crate::errors::{Error, MisuseError, Result};

/// Generates `*_async` variants of [`XmlWrite`] methods which run the method
/// on the staged chain and then send produced output to the sink.
macro_rules! impl_async_writes {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),*) => $sync:ident;
    )*) => {
        $(
            $(#[$meta])*
            pub async fn $name(&mut self, $($arg: $ty),*) -> Result<()> {
                self.run(|writer| writer.$sync($($arg),*)).await
            }
        )*
    };
}

/// Drives a writer chain which stages its output in memory and sends the
/// output to an asynchronous sink.
///
/// Only one asynchronous operation may run at a time. An operation is marked
/// as running when its future is first polled and unmarked when it completes,
/// successfully or not. Any call made while an operation is marked, including
/// synchronous [`XmlWrite`] calls, fails with
/// [`MisuseError::AsyncCallInProgress`]. A future dropped before completion
/// leaves the mark set, so the writer cannot be used anymore: the output may
/// have been partially sent.
///
/// Synchronous [`XmlWrite`] methods only stage output; it is sent by the next
/// asynchronous operation.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// # tokio_test::block_on(async {
/// use xml_pipeline::writer::WriterSettings;
///
/// let mut sink = Vec::new();
/// let settings = WriterSettings {
///     omit_xml_declaration: true,
///     ..WriterSettings::default()
/// };
/// let mut writer = settings.create_async_writer(&mut sink);
///
/// writer.write_start_element_async("", "root", "").await.unwrap();
/// writer.write_string_async("text").await.unwrap();
/// writer.write_end_element_async().await.unwrap();
/// writer.close_async().await.unwrap();
/// drop(writer);
///
/// assert_eq!(sink, b"<root>text</root>");
/// # })
/// ```
pub struct AsyncCheckWriter<W, S> {
    inner: W,
    sink: S,
    in_flight: bool,
}

impl<W: StagedWrite, S: AsyncWrite + Unpin> AsyncCheckWriter<W, S> {
    /// Creates a writer which sends output of `inner` into `sink`.
    pub fn new(inner: W, sink: S) -> Self {
        Self {
            inner,
            sink,
            in_flight: false,
        }
    }

    /// Returns a reference to the sink.
    pub fn get_ref(&self) -> &S {
        &self.sink
    }

    /// Consumes the writer, returning the staged chain and the sink.
    pub fn into_inner(self) -> (W, S) {
        (self.inner, self.sink)
    }

    /// Returns `true` if an asynchronous operation was started and did not
    /// complete.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    #[inline]
    fn check(&self) -> Result<()> {
        if self.in_flight {
            return Err(MisuseError::AsyncCallInProgress.into());
        }
        Ok(())
    }

    /// Runs a synchronous operation on the chain and sends its output.
    async fn run<F>(&mut self, operation: F) -> Result<()>
    where
        F: FnOnce(&mut W) -> Result<()>,
    {
        self.check()?;
        self.in_flight = true;
        let result = self.drain(operation).await;
        self.in_flight = false;
        result
    }

    async fn drain<F>(&mut self, operation: F) -> Result<()>
    where
        F: FnOnce(&mut W) -> Result<()>,
    {
        operation(&mut self.inner)?;
        let output = self.inner.take_output()?;
        if !output.is_empty() {
            self.sink.write_all(&output).await?;
        }
        Ok(())
    }

    impl_async_writes! {
        /// Asynchronous [`XmlWrite::write_start_document`].
        fn write_start_document_async(standalone: Option<bool>) => write_start_document;
        /// Asynchronous [`XmlWrite::write_end_document`].
        fn write_end_document_async() => write_end_document;
        /// Asynchronous [`XmlWrite::write_doc_type`].
        fn write_doc_type_async(
            name: &str,
            public_id: Option<&str>,
            system_id: Option<&str>,
            subset: Option<&str>
        ) => write_doc_type;
        /// Asynchronous [`XmlWrite::write_start_element`].
        fn write_start_element_async(prefix: &str, local_name: &str, namespace: &str) => write_start_element;
        /// Asynchronous [`XmlWrite::write_end_element`].
        fn write_end_element_async() => write_end_element;
        /// Asynchronous [`XmlWrite::write_full_end_element`].
        fn write_full_end_element_async() => write_full_end_element;
        /// Asynchronous [`XmlWrite::write_start_attribute`].
        fn write_start_attribute_async(prefix: &str, local_name: &str, namespace: &str) => write_start_attribute;
        /// Asynchronous [`XmlWrite::write_end_attribute`].
        fn write_end_attribute_async() => write_end_attribute;
        /// Asynchronous [`XmlWrite::write_attribute_string`].
        fn write_attribute_string_async(prefix: &str, local_name: &str, namespace: &str, value: &str) => write_attribute_string;
        /// Asynchronous [`XmlWrite::write_element_string`].
        fn write_element_string_async(prefix: &str, local_name: &str, namespace: &str, value: &str) => write_element_string;
        /// Asynchronous [`XmlWrite::write_cdata`].
        fn write_cdata_async(text: &str) => write_cdata;
        /// Asynchronous [`XmlWrite::write_comment`].
        fn write_comment_async(text: &str) => write_comment;
        /// Asynchronous [`XmlWrite::write_processing_instruction`].
        fn write_processing_instruction_async(name: &str, text: &str) => write_processing_instruction;
        /// Asynchronous [`XmlWrite::write_entity_ref`].
        fn write_entity_ref_async(name: &str) => write_entity_ref;
        /// Asynchronous [`XmlWrite::write_char_entity`].
        fn write_char_entity_async(ch: char) => write_char_entity;
        /// Asynchronous [`XmlWrite::write_whitespace`].
        fn write_whitespace_async(whitespace: &str) => write_whitespace;
        /// Asynchronous [`XmlWrite::write_string`].
        fn write_string_async(text: &str) => write_string;
        /// Asynchronous [`XmlWrite::write_raw`].
        fn write_raw_async(data: &str) => write_raw;
    }

    /// Sends all staged output and flushes the sink.
    pub async fn flush_async(&mut self) -> Result<()> {
        self.check()?;
        self.in_flight = true;
        let result = async {
            self.drain(|writer| writer.flush()).await?;
            self.sink.flush().await?;
            Ok::<_, Error>(())
        }
        .await;
        self.in_flight = false;
        result
    }

    /// Closes the chain, sends all staged output and shuts the sink down.
    pub async fn close_async(&mut self) -> Result<()> {
        self.check()?;
        self.in_flight = true;
        let result = async {
            self.drain(|writer| writer.close()).await?;
            self.sink.shutdown().await?;
            Ok::<_, Error>(())
        }
        .await;
        self.in_flight = false;
        result
    }
}

impl<W: StagedWrite, S: AsyncWrite + Unpin> XmlWrite for AsyncCheckWriter<W, S> {
    fn settings(&self) -> Option<&WriterSettings> {
        self.inner.settings()
    }

    fn write_state(&self) -> WriteState {
        self.inner.write_state()
    }

    fn write_start_document(&mut self, standalone: Option<bool>) -> Result<()> {
        self.check()?;
        self.inner.write_start_document(standalone)
    }

    fn write_end_document(&mut self) -> Result<()> {
        self.check()?;
        self.inner.write_end_document()
    }

    fn write_doc_type(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
        subset: Option<&str>,
    ) -> Result<()> {
        self.check()?;
        self.inner.write_doc_type(name, public_id, system_id, subset)
    }

    fn write_start_element(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.check()?;
        self.inner.write_start_element(prefix, local_name, namespace)
    }

    fn write_end_element(&mut self) -> Result<()> {
        self.check()?;
        self.inner.write_end_element()
    }

    fn write_full_end_element(&mut self) -> Result<()> {
        self.check()?;
        self.inner.write_full_end_element()
    }

    fn write_start_attribute(&mut self, prefix: &str, local_name: &str, namespace: &str) -> Result<()> {
        self.check()?;
        self.inner
            .write_start_attribute(prefix, local_name, namespace)
    }

    fn write_end_attribute(&mut self) -> Result<()> {
        self.check()?;
        self.inner.write_end_attribute()
    }

    fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.check()?;
        self.inner.write_cdata(text)
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        self.check()?;
        self.inner.write_comment(text)
    }

    fn write_processing_instruction(&mut self, name: &str, text: &str) -> Result<()> {
        self.check()?;
        self.inner.write_processing_instruction(name, text)
    }

    fn write_entity_ref(&mut self, name: &str) -> Result<()> {
        self.check()?;
        self.inner.write_entity_ref(name)
    }

    fn write_char_entity(&mut self, ch: char) -> Result<()> {
        self.check()?;
        self.inner.write_char_entity(ch)
    }

    fn write_whitespace(&mut self, whitespace: &str) -> Result<()> {
        self.check()?;
        self.inner.write_whitespace(whitespace)
    }

    fn write_string(&mut self, text: &str) -> Result<()> {
        self.check()?;
        self.inner.write_string(text)
    }

    fn write_raw(&mut self, data: &str) -> Result<()> {
        self.check()?;
        self.inner.write_raw(data)
    }

    /// Flushes the staged chain. The output stays staged until the next
    /// asynchronous operation.
    fn flush(&mut self) -> Result<()> {
        self.check()?;
        self.inner.flush()
    }

    /// Closes the staged chain. The output stays staged until the next
    /// asynchronous operation, use [`close_async`](Self::close_async) to send it.
    fn close(&mut self) -> Result<()> {
        self.check()?;
        self.inner.close()
    }
}

impl<W: StagedWrite, S> BufferedOutput for AsyncCheckWriter<W, S> {
    fn take_output(&mut self) -> Result<Vec<u8>> {
        if self.in_flight {
            return Err(MisuseError::AsyncCallInProgress.into());
        }
        self.inner.take_output()
    }
}
