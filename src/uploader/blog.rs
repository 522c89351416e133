// ABOUTME: Blog media backend speaking MetaWeblog XML-RPC
// ABOUTME: Sends one metaWeblog.newMediaObject call per image and reads the URL from the reply

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client as HttpClient};
use roxmltree::{Document, Node};

use crate::config::BlogSettings;

pub struct BlogUploader {
    http_client: HttpClient,
    settings: BlogSettings,
    pub(crate) rename: bool,
}

impl BlogUploader {
    pub fn new(settings: BlogSettings, rename: bool) -> Self {
        Self {
            http_client: HttpClient::new(),
            settings,
            rename,
        }
    }

    pub async fn upload(&self, data: &[u8], file_name: &str) -> Result<String> {
        if self.settings.blog_url.trim().is_empty() {
            anyhow::bail!("No blog URL configured (blogSetting.blogUrl)");
        }

        let mime_type = mime_guess::from_path(file_name).first_or_octet_stream();
        let body = new_media_object_call(&self.settings, file_name, mime_type.as_ref(), data);

        let response = self.http_client
            .post(self.settings.blog_url.trim())
            .header(header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .context("Failed to reach blog endpoint")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("Blog upload failed: HTTP {}\n{}", status, text);
        }

        parse_media_info(&text)
    }
}

/// Build the XML-RPC request body
pub fn new_media_object_call(
    settings: &BlogSettings,
    name: &str,
    mime_type: &str,
    data: &[u8],
) -> String {
    format!(
        r#"<?xml version="1.0"?>
<methodCall>
  <methodName>metaWeblog.newMediaObject</methodName>
  <params>
    <param><value><string>{blog_id}</string></value></param>
    <param><value><string>{user}</string></value></param>
    <param><value><string>{password}</string></value></param>
    <param>
      <value>
        <struct>
          <member><name>name</name><value><string>{name}</string></value></member>
          <member><name>type</name><value><string>{mime}</string></value></member>
          <member><name>bits</name><value><base64>{bits}</base64></value></member>
        </struct>
      </value>
    </param>
  </params>
</methodCall>"#,
        blog_id = xml_escape(&settings.blog_id),
        user = xml_escape(&settings.blog_user_name),
        password = xml_escape(&settings.blog_password),
        name = xml_escape(name),
        mime = xml_escape(mime_type),
        bits = STANDARD.encode(data),
    )
}

/// Pull the media URL out of a newMediaObject response.
///
/// Uses the `url` member of the returned struct, falling back to the first
/// member with a value. Faults become errors carrying the fault string.
pub fn parse_media_info(body: &str) -> Result<String> {
    let document = Document::parse(body).context("Blog response is not valid XML")?;

    let members: Vec<(String, String)> = document
        .descendants()
        .filter(|n| n.has_tag_name("member"))
        .filter_map(member_pair)
        .collect();

    if document.descendants().any(|n| n.has_tag_name("fault")) {
        let reason = members
            .iter()
            .find(|(name, _)| name == "faultString")
            .map(|(_, value)| value.as_str())
            .unwrap_or("unknown fault");
        anyhow::bail!("Blog rejected the upload: {}", reason);
    }

    members
        .iter()
        .find(|(name, value)| name == "url" && !value.is_empty())
        .or_else(|| members.iter().find(|(_, value)| !value.is_empty()))
        .map(|(_, value)| value.clone())
        .context("Blog response carries no media URL")
}

/// Name and value text of one struct member; CDATA sections read as plain text
fn member_pair(member: Node) -> Option<(String, String)> {
    let name = member.children().find(|n| n.has_tag_name("name"))?;
    let value = member.children().find(|n| n.has_tag_name("value"))?;
    Some((text_of(name).trim().to_string(), text_of(value).trim().to_string()))
}

fn text_of(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
